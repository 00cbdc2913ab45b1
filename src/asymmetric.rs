//! 非对称加密原语：RSA 系统与混合信封。
pub mod envelope;
pub mod errors;
pub mod systems;
pub mod traits;

pub use errors::AsymmetricError;
pub use systems::traditional::{RsaCryptoSystem, RsaPrivateKeyWrapper, RsaPublicKeyWrapper};
pub use traits::AsymmetricCryptographicSystem;
