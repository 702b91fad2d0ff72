pub mod directive;
pub mod error;
pub mod render;
pub mod scrape_output;
pub mod session;
pub mod tool_call;
pub mod transcript;

pub use directive::*;
pub use error::*;
pub use render::*;
pub use scrape_output::*;
pub use session::*;
pub use tool_call::*;
pub use transcript::*;
