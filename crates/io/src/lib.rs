// Text codec for the vendor export format. No file or process I/O here:
// raw text in, raw text out. Capture and writing belong to the caller.

pub mod changeset;
pub mod scewin;
