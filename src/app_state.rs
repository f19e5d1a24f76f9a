use std::sync::Arc;

use crate::services::calls::CallService;
use crate::services::chats::ChatService;
use crate::services::messages::MessageService;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub messages: MessageService,
    pub chats: ChatService,
    pub calls: CallService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            messages: MessageService::new(store.clone()),
            chats: ChatService::new(store.clone()),
            calls: CallService::new(store),
        }
    }
}
