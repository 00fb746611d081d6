/*!
# depgraph_lib

A library computing interprocedural dependence information for imperative
programs.

The input is an abstract *pointer graph* produced by a front-end: a typed node
graph whose nodes model allocations, loads, stores, address arithmetic, calls
and control events. On top of it the library provides:

* a flow-sensitive, field-sensitive points-to analysis
  ([`analysis::points_to`]),
* a reaching-definitions analysis parametrized by the points-to results
  ([`analysis::reaching_definitions`]),
* basic blocks with dominator/post-dominator trees, dominance frontiers and
  control-dependence edges ([`cfg`]).

The library performs no I/O of its own. All analyses report through a
caller-supplied log sink, see [`utils::log`].
*/

pub mod analysis;
pub mod cfg;
pub mod graph;
pub mod pointer;
pub mod utils;

mod prelude {
    pub use anyhow::{anyhow, Error};
    pub use serde::{Deserialize, Serialize};

    pub use crate::graph::NodeId;
    pub use crate::pointer::{Offset, Pointer};
}
