pub mod clock;
pub mod controller;
pub mod gpu_context;
pub mod input_adapter;
pub mod shutdown;
pub mod timer;
pub mod window;

pub use clock::Clock;
pub use controller::{Button, Controller};
pub use gpu_context::GpuContext;
pub use input_adapter::WinitController;
pub use shutdown::ShutdownToken;
pub use timer::Throttled;
pub use window::Viewport;
