pub mod annotations;
pub mod chapter;
pub mod domain;
pub mod engagement;
pub mod graph;
pub mod ports;
pub mod selection;
pub mod service;
pub mod viewer;

pub use annotations::{AnnotationError, AnnotationStore};
pub use chapter::{Chapter, ChapterError};
pub use domain::{
    AuthSession, ChapterAnnotation, ChapterAnnotations, ChapterMap, Citation, Comment, MapPatch,
    NewMap, Theme, User, UserCredentials,
};
pub use graph::{ChapterRelationship, GraphData, GraphNode, Link, NodeId};
pub use ports::{MapRepository, PortError, PortResult, UserRepository};
pub use selection::{RelationshipMap, SelectionMachine, SelectionState};
pub use service::MapService;
pub use viewer::{CurrentUser, Viewer};
