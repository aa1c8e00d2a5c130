pub mod reconciler;
pub mod reporters;
