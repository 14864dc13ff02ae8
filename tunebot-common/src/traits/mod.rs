pub mod audio_engine;
pub mod chat_traits;
pub mod repository_traits;

pub use audio_engine::AudioEngine;
pub use chat_traits::ChatGateway;
pub use repository_traits::FavoritesRepository;
