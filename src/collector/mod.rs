// Background collectors, one task per monitored entity.

mod container;
mod decode;
mod volume;

pub use container::{ContainerCollector, ContainerEntity, ContainerRecord};
pub use decode::{compute_cpu_percent, memory_percent};
pub use volume::{VolumeCollector, VolumeEntity, VolumeRecord};
