// CONTROLLER: Input, game logic, and update loop
pub mod camera_rig;
pub mod frame_loop;
pub mod input;
pub mod interactables;
pub mod motion;
pub mod overlay;
pub mod physics;

pub use camera_rig::{CameraMode, CameraPose, CameraRig, PointerCapture};
pub use frame_loop::{DebugInfo, FrameClock, TickOutput, Walkthrough};
pub use input::{ControlState, FrameInput, InputEvent, InputSampler, KeyBindings};
pub use interactables::{InteractableRegistry, LoadReport};
pub use motion::{AnimationState, MotionInput, MotionIntegrator, PlayerBody};
pub use overlay::{OverlayFrame, OverlayPresenter, Prompt};
pub use physics::PhysicsWorld;
