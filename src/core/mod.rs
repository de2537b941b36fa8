pub mod http_server;
pub mod service_manager;

pub use http_server::HealthService;
pub use service_manager::ServiceManager;
