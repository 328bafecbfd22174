//! Fixed and mobile features of a polymer.

mod fixed;
mod mobile;

pub use fixed::{Binding, BindingSite, FixedElement, Release, ReleaseSite, SiteRole};
pub use mobile::{MobileElement, MobileKind};

/// Name of the (single) ribosome species.
pub const RIBOSOME: &str = "ribosome";
/// Name of the RNase element that degrades transcripts.
pub const RNASE: &str = "__rnase";
/// Name of the 5'-end RNase entry site added to degradable transcripts.
pub const RNASE_SITE: &str = "__rnase_site";
/// Name of internal RNase entry sites copied from genome templates.
pub const RNASE_SITE_INTERNAL: &str = "__rnase_site_internal";
/// Name given to every mask.
pub const MASK: &str = "mask";
/// Name given to every stop-codon release site.
pub const STOP_CODON: &str = "stop_codon";
/// Gene reported when an element runs off the end of its polymer.
pub const RUNOFF_GENE: &str = "NA";
