pub mod cache;
pub mod owners;
pub mod permissions;
pub mod resolver;

pub use cache::MemoryCache;
pub use permissions::ConfigPermissions;
pub use resolver::ApproverResolver;
