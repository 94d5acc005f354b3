//! Decomposition of an index domain into vnodes owned by ranks.

pub mod centered;
pub mod domain_map;
pub mod field_layout;
pub mod partition;
pub mod user;
pub mod vnode;

pub use centered::{Centering, centered_layout};
pub use domain_map::{DomainEntry, DomainMap};
pub use field_layout::FieldLayout;
pub use partition::{Partition, SplitRange, locate_split_range, owning_rank, split_domain};
pub use user::{FieldLayoutUser, SharedUser, UserId, UserList};
pub use vnode::{NO_VNODE_ID, Vnode, VnodeRef};
