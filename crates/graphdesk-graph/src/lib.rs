pub mod index;
pub mod model;
pub mod snap;
pub mod visibility;

pub use index::{Coord, CoordinateIndex, ZERO_RANGE_EPSILON};
pub use model::{
    EdgeData, GraphElement, GraphFile, GraphModel, NodeData, ObservableState, RemovedElements,
    Scratch,
};
pub use snap::{
    AxisSnap, DistributionKind, DragOutcome, DragSnap, DragUpdate, Guideline, SnapEngine,
    SnapIndex, SnapResult, SnapSettings, SnapSource, snap_to_grid,
};
pub use visibility::{AddPlan, HidePlan, RemovePlan, ShowPlan};
