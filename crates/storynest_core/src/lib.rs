pub mod content;
pub mod domain;
pub mod engagement;
pub mod ports;

pub use content::{deserialize_pages, serialize_pages, ContentFormatError, Page};
pub use domain::{
    Author, GeneratedPage, GeneratedStory, SortDirection, SortKey, Story, StoryDraft,
    StoryFilter, StoryListing, StoryPatch, User, UserCredentials,
};
pub use engagement::{Engagement, EngagementError, Vote, VoteChange, VoteState};
pub use ports::{
    FileStore, ImageGenerationService, PortError, PortResult, StoryGenerationService, StoryStore,
    UserStore,
};
