use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct RecordedEvent {
    pub id: Uuid,
}
