mod csprng;

pub use csprng::{Csprng, RandomSource, RngError};
