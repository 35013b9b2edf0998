//! HTTP implementations of the capability traits.
//!
//! Each module adapts one vendor's wire format to the
//! [`crate::capability`] traits. All of them share the pooled client from
//! [`crate::http::build_client`].

pub mod elevenlabs;
pub mod heygen;
pub mod openai;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use heygen::HeyGenRenderer;
pub use openai::OpenAiTextGenerator;
