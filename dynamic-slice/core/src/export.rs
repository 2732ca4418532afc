use std::io::Write;

use crate::instruction::Instruction;

pub trait SliceExport {
    fn write(&mut self, instruction: &Instruction) -> Result<(), ExportError>;
    fn flush(&mut self) -> Result<(), ExportError>;
}

/// One rendered instruction per line, in slice order.
pub struct TextExport<W: Write> {
    writer: W,
}

impl<W: Write> TextExport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SliceExport for TextExport<W> {
    fn write(&mut self, instruction: &Instruction) -> Result<(), ExportError> {
        writeln!(self.writer, "{instruction}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ExportError> {
        self.writer.flush()?;
        Ok(())
    }
}

pub fn write_listing<E: SliceExport + ?Sized>(
    export: &mut E,
    instructions: &[Instruction],
) -> Result<(), ExportError> {
    for instruction in instructions {
        export.write(instruction)?;
    }
    export.flush()
}

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_per_instruction() {
        let insns = vec![
            Instruction::new(0x10, "mov eax,0x5", None, "mov"),
            Instruction::new(0x14, "add eax,ebx", None, "add"),
        ];
        let mut export = TextExport::new(Vec::new());
        write_listing(&mut export, &insns).unwrap();
        let text = String::from_utf8(export.into_inner()).unwrap();
        assert_eq!(text, "0x10: mov eax,0x5\n0x14: add eax,ebx\n");
    }
}
