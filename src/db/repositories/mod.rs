mod challenges;
mod progress;

pub use challenges::NewChallenge;
