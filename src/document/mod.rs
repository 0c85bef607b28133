/*!
 * Document data model shared by every stage of the pipeline.
 *
 * - `model`: documents, format kinds, domain profiles and output modes
 * - `segment`: translatable units and their positions
 */

pub mod model;
pub mod segment;

pub use self::model::{Document, DocumentId, DomainProfile, FormatKind, OutputMode, SourceDocument};
pub use self::segment::{IllegalStatusTransition, Segment, SegmentLocation, SegmentStatus};
