pub mod ids;
pub mod location;
pub mod record;

pub use ids::{NodeId, TreeNodeId};
pub use location::Location;
pub use record::ElementRecord;
