/// Model identifiers served by the local Ollama daemon
pub mod models {
    /// Conversational model (a Modelfile derivative of Gemma tuned for chat)
    pub const DEFAULT_CHAT_MODEL: &str = "gemma-friend";
    /// Stock model used for memory summarization
    pub const DEFAULT_SUMMARY_MODEL: &str = "gemma3:4b";
}

pub mod defaults {
    pub const DEFAULT_MAX_HISTORY: usize = 20;
    pub const DEFAULT_ASSISTANT_LABEL: &str = "Gemma";
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
    pub const SUMMARY_PREVIEW_CHARS: usize = 50;
}

pub mod storage {
    pub const BACKEND_FIRESTORE: &str = "firestore";
    pub const BACKEND_FILE: &str = "file";
    pub const BACKEND_MEMORY: &str = "memory";

    pub const DEFAULT_COLLECTION: &str = "gemma_conversations";
    pub const DEFAULT_DOCUMENT_ID: &str = "user_session";
    pub const DEFAULT_DATABASE: &str = "(default)";
    /// Subdirectory of `~/.memchat` used by the file backend
    pub const DATA_SUBDIR: &str = "data";

    pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
    /// OAuth scope requested from Application Default Credentials
    pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
}

pub mod env_vars {
    pub const PROJECT_ID: &str = "GCP_PROJECT_ID";
    pub const ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
    pub const FIRESTORE_EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";
    pub const OLLAMA_HOST: &str = "OLLAMA_HOST";
}

pub mod urls {
    pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
}

pub mod files {
    pub const CONFIG_FILE_NAME: &str = "memchat.toml";
    pub const CONFIG_DIR_NAME: &str = ".memchat";
}

/// Message role constants to avoid hardcoding strings
pub mod message_roles {
    pub const SYSTEM: &str = "system";
    pub const USER: &str = "user";
    pub const ASSISTANT: &str = "assistant";
}

/// Interactive commands recognised at the prompt
pub mod commands {
    pub const EXIT: &str = "exit";
    pub const QUIT: &str = "quit";
    pub const RESET: &str = "reset";
}

pub mod ui {
    pub const USER_PROMPT: &str = "You: ";
    pub const TRANSCRIPT_USER_LABEL: &str = "User";
    pub const FAREWELL: &str = "Goodbye!";
}
