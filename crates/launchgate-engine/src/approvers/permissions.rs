use launchgate_core::config::LaunchgateConfig;
use launchgate_core::traits::PermissionChecker;

/// Site admins taken from the `admins` list in config.
#[derive(Debug, Clone, Default)]
pub struct ConfigPermissions {
    admins: Vec<String>,
}

impl ConfigPermissions {
    pub fn new(admins: Vec<String>) -> Self {
        Self { admins }
    }

    pub fn from_config(config: &LaunchgateConfig) -> Self {
        Self::new(config.admins.clone())
    }
}

impl PermissionChecker for ConfigPermissions {
    fn can_admin_site(&self, user: &str) -> bool {
        self.admins.iter().any(|a| a.eq_ignore_ascii_case(user))
    }
}
