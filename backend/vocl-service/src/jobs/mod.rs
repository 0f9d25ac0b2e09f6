/// Background jobs run inside the service process
pub mod scheduled_posts;

pub use scheduled_posts::start_scheduled_post_publisher;
