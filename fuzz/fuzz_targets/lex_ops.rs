#![no_main]

use std::io::{self, Read};

use libfuzzer_sys::fuzz_target;
use lexbuf::{Lexer, LexerConfig};

/// Reader handing out `step` bytes per call.
struct Stepped<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Stepped<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

fuzz_target!(|input: (Vec<u8>, Vec<u8>, u8, u8)| {
    let (data, ops, step, capacity) = input;
    let config = LexerConfig::new(1 + usize::from(capacity % 64)).unwrap();
    let reader = Stepped {
        data: &data,
        step: 1 + usize::from(step % 32),
    };

    // Drive a streaming lexer and an in-memory one through the same
    // operations; they must agree on every observation.
    let mut streamed = Lexer::with_config(reader, config).unwrap();
    let mut memory = Lexer::from_bytes(&data);
    let mut shifted = 0usize;
    let mut freed = 0usize;

    for op in ops {
        let arg = usize::from(op >> 3);
        match op & 7 {
            0 => assert_eq!(streamed.peek(arg), memory.peek(arg)),
            1 => assert_eq!(streamed.peek_rune(arg), memory.peek_rune(arg)),
            2 => {
                streamed.move_by(1 + arg as isize);
                memory.move_by(1 + arg as isize);
            }
            3 => {
                let back = arg.min(streamed.pos()) as isize;
                streamed.move_by(-back);
                memory.move_by(-back);
            }
            4 => {
                streamed.move_to(arg);
                memory.move_to(arg);
            }
            5 => {
                // Selections must be fully buffered before they compare.
                streamed.peek(0);
                memory.peek(0);
                let n = streamed.pos();
                assert_eq!(streamed.offset(), memory.offset());
                assert_eq!(streamed.shift(), memory.shift());
                shifted += n;
            }
            6 => {
                shifted += streamed.pos();
                streamed.skip();
                memory.skip();
            }
            _ => {
                let n = arg.min(shifted - freed);
                streamed.free(n);
                memory.free(n);
                freed += n;
            }
        }
        assert_eq!(streamed.pos(), memory.pos());
        assert_eq!(streamed.offset(), memory.offset());
    }
});
