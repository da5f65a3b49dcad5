//! Fuzz target: arbitrary jump/label topologies never trip the emitter's
//! internal-consistency assertions (§4.6, §7).
//!
//! Every instruction chosen here has a statically-known zero stack effect
//! (`jump`, `label_assign`, `pop_block`, `rot_two`/`rot_three`), so a
//! malformed *topology* is the only thing under test — stack underflow is
//! impossible by construction. Every label is forced open (assigned) before
//! the scope ends, so "unresolved label at EMIT" is also excluded by
//! construction; what remains is exactly the property the label table
//! exists to guarantee: that CODE_SIZE and EMIT agree on every label's
//! offset no matter how the jumps are interleaved.

#![no_main]

use embc::{DiscardingSink, Emitter, Label, Pass, Qstr, Scope};
use libfuzzer_sys::fuzz_target;

const NUM_LABELS: u32 = 8;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > 256 {
        return;
    }

    let mut scope = Scope::new(Qstr::from_ascii(b'f'), Qstr::from_ascii(b'f'));
    let mut emitter: Emitter = Emitter::new(NUM_LABELS, 0);
    let mut sink = DiscardingSink;
    // Labels are stable handles for the whole scope: allocated once, then
    // assigned and jumped to independently in each of the four passes.
    let labels: Vec<Label> = (0..NUM_LABELS).map(|_| emitter.new_label().unwrap()).collect();

    for pass in [Pass::Scope, Pass::StackSize, Pass::CodeSize, Pass::Emit] {
        emitter.start_pass(pass, &scope).unwrap();
        let mut assigned = vec![false; NUM_LABELS as usize];

        for &byte in data {
            let target = (byte & 0x07) as usize;
            match (byte >> 3) & 0x03 {
                0 => emitter.jump(labels[target]),
                1 => {
                    if !assigned[target] {
                        emitter.label_assign(labels[target]);
                        assigned[target] = true;
                    }
                }
                2 => emitter.rot_two(),
                _ => emitter.rot_three(),
            }
        }

        // Every label must be assigned before the scope ends (§4.6); force
        // open whatever the fuzz data didn't reach.
        for (idx, label) in labels.iter().enumerate() {
            if !assigned[idx] {
                emitter.label_assign(*label);
            }
        }
        emitter.load_none();
        emitter.return_value();
        emitter.end_pass(&mut scope, &mut sink);
    }
});
