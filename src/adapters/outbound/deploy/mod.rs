mod docker;

pub use docker::{ContainerProvisioner, DeployedSlave};
