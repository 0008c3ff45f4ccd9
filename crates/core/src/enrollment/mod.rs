//! Enrollment module - the catalog selection and goal submission state machine.

mod enrollment_model;
mod enrollment_workflow;


pub use enrollment_model::{EnrollmentSelection, EnrollmentState};
pub use enrollment_workflow::EnrollmentWorkflow;
