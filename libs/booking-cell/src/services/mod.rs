pub mod admission;

pub use admission::AdmissionService;
