use rand::Rng;

/// Length of every discount code.
pub const CODE_LENGTH: usize = 8;

/// Characters a code may contain (36 symbols, 36^8 possible codes).
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generador de códigos de descuento.
///
/// Stateless: every position is drawn independently and uniformly from
/// [`CODE_ALPHABET`] using the random source handed in by the caller.
/// Uniqueness is not its concern; the store decides that.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Genera un código candidato
    pub fn generate<R: Rng>(&self, rng: &mut R) -> String {
        (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    /// True when `code` has the shape of something this generator could produce.
    pub fn is_well_formed(code: &str) -> bool {
        code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
    }
}
