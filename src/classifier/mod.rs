// External classifier clients — trait seams for the two models, the
// Groq-backed implementations, and the gateway that coordinates them.
//
// The traits exist so the gateway (and tests) never depend on a concrete
// provider: a classifier is anything that can check or score text.

pub mod gateway;
pub mod groq;
pub mod guard;
pub mod scorer;
pub mod traits;
