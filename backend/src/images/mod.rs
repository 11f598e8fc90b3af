mod unsplash;

pub use unsplash::{ImageSearchError, UnsplashClient};
