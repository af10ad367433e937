//! 命令定义和实现

pub mod cantest;
pub mod fakejsm;
pub mod relay;
pub mod simulate;

pub use cantest::CantestCommand;
pub use fakejsm::FakeJsmCommand;
pub use relay::RelayCommand;
pub use simulate::SimulateCommand;
