mod object_id;

pub use object_id::{InvalidObjectId, ObjectId};
