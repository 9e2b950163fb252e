//! Per-message execution: the bounded upstream pool, the planning loop
//! and the staffing tools it drives.

pub mod planner;
pub mod pool;
pub mod tools;

pub use planner::{
    LlmPlannerFactory, PlanError, PlanInput, PlanOutput, Planner, PlannerFactory,
    PlannerSetupError, ToolExecutor, ToolLoopPlanner, ToolOutput, ToolStep,
};
pub use pool::UpstreamPool;
pub use tools::{RequestTools, ToolScope};
