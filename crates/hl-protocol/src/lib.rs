pub mod backchannel;
pub mod directive;
pub mod property;
pub mod shadow;
pub mod template;
pub mod topics;
pub mod version;

pub use backchannel::*;
pub use directive::*;
pub use property::*;
pub use shadow::*;
pub use template::*;
