//! Recipe text extraction
//!
//! The legacy mixing software prints recipes as plain text: labeled header
//! lines followed by one section per paint layer.
//!
//! ```text
//! Fórmula Nº: 40213          Historia: F-2291
//! Marca: SEAT   Color: LS9R  Código Sayer: 7781
//! Tipo de acabado: Bicapa    Aparejo: Gris
//!
//! Primera capa
//!  1: KT-1400   323,0
//!  2: KT-1520    41,5 g
//! Total          364,5
//! ```
//!
//! [`parse_recipe`] is pure and works on text from either the virtual printer
//! or a spool file.

mod parser;

pub use parser::{DEFAULT_BATCH_CODE, DEFAULT_NUMBER, parse_recipe};
