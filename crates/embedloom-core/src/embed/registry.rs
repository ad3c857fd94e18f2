use std::fmt;
use std::rc::Rc;

use super::{AppleMusicEmbedder, DropboxEmbedder, Embedder, SpotifyEmbedder, TwitterEmbedder, YoutubeEmbedder};

/// Ordered list of embedders. The first one that accepts a URL wins.
#[derive(Clone, Default)]
pub struct EmbedderRegistry {
    embedders: Vec<Rc<dyn Embedder>>,
}

impl EmbedderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default order: Twitter, Dropbox, Apple Music, Spotify, YouTube.
    pub fn standard(twitter: Rc<TwitterEmbedder>, dropbox: Rc<DropboxEmbedder>) -> Self {
        Self::new()
            .with(twitter)
            .with(dropbox)
            .with(Rc::new(AppleMusicEmbedder))
            .with(Rc::new(SpotifyEmbedder))
            .with(Rc::new(YoutubeEmbedder))
    }

    pub fn push(&mut self, embedder: Rc<dyn Embedder>) {
        self.embedders.push(embedder);
    }

    pub fn with(mut self, embedder: Rc<dyn Embedder>) -> Self {
        self.push(embedder);
        self
    }

    /// First embedder that can handle `url`.
    pub fn find(&self, url: &str) -> Option<&Rc<dyn Embedder>> {
        self.embedders.iter().find(|e| e.can_add_embed(url))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn Embedder>> {
        self.embedders.iter()
    }

    pub fn len(&self) -> usize {
        self.embedders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embedders.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.embedders.iter().map(|e| e.name()).collect()
    }
}

impl fmt::Debug for EmbedderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
