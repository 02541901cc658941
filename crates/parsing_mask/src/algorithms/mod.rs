pub mod blur;
pub mod contrast;
pub mod morphology;

pub use blur::*;
pub use contrast::*;
pub use morphology::*;
