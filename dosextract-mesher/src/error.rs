use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Failures raised while laying out a mesh from its regions
pub enum MeshError {
    #[error("a mesh needs at least one region")]
    NoRegions,
    #[error("region {region} has non-positive width {width}")]
    NonPositiveWidth { region: usize, width: f64 },
    #[error("region {0} must contain at least one cell")]
    EmptyRegion(usize),
}
