use clap::Parser;
use clap_num::maybe_hex;
use lazy_static::lazy_static;

#[derive(Parser, Debug)]
#[command(author,version,about,long_about=None)]
pub struct Args {
    /// JSON opcode table (merged 0xNN/0xCBNN keys, or the unprefixed table only)
    pub table: String,

    /// Separately sourced JSON table for the 0xCB-prefixed opcodes (keys 0xNN)
    #[arg(long)]
    pub cb_table: Option<String>,

    /// Line-indexed reference document describing the unprefixed opcodes
    #[arg(long)]
    pub doc: Option<String>,

    /// Line-indexed reference document describing the prefixed opcodes
    #[arg(long)]
    pub doc_cb: Option<String>,

    /// Path that qualifies handler names in the decoder and owns the handler stubs
    #[arg(long, default_value = "Cpu")]
    pub handler_path: String,

    /// Write the generated files (decoder.rs, disassembler.rs, handlers.rs)
    #[arg(short, long)]
    pub write_files: bool,

    /// Directory the generated files are written to
    #[arg(long, default_value = "generated")]
    pub out_dir: String,

    /// Print the decoder and disassembler to stdout
    #[arg(short, long)]
    pub print: bool,

    /// Raw binary (.bin) or Intel HEX (.hex) image to disassemble with the table
    #[arg(long)]
    pub disassemble: Option<String>,

    /// Load address for raw binary images (hex ok with '0x')
    #[arg(long,value_parser=maybe_hex::<u16>, default_value_t=0x0000_u16)]
    pub org: u16,

    /// Maximum number of instructions to list when disassembling
    #[arg(long)]
    pub count: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

lazy_static! {
    pub static ref ARGS: Args = if cfg!(test) {
        // manually set parameters for running tests
        Args::parse_from(["test", "data/opcodes.json"])
    } else {
        Args::parse()
    };
}

pub fn init() { lazy_static::initialize(&ARGS) }
pub fn generate() -> bool { ARGS.write_files || ARGS.print }
