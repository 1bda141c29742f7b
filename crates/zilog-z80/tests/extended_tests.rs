//! ED page: 16-bit arithmetic, I/O through BC, interrupt registers and the
//! block instructions.

use emu_core::FlatBus;
use zilog_z80::{CF, HF, NF, PF, SF, ZF, Z80};

/// CPU at 0 with `program` loaded and registers prepared by `setup`.
fn prepare(program: &[u8], setup: impl FnOnce(&mut Z80)) -> (Z80, FlatBus) {
    let mut bus = FlatBus::new();
    bus.load(0x0000, program);
    let mut cpu = Z80::new();
    setup(&mut cpu);
    (cpu, bus)
}

#[test]
fn test_ldir_copies_block() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xB0], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x1000);
        regs.set_de(0x2000);
        regs.set_bc(8);
    });
    bus.load(0x1000, &[1, 2, 3, 4, 5, 6, 7, 8]);

    cpu.step(&mut bus, 1).unwrap();

    for i in 0..8 {
        assert_eq!(bus.peek(0x2000 + i), bus.peek(0x1000 + i));
    }
    assert_eq!(bus.peek(0x2008), 0, "nothing past the block");
    assert_eq!(cpu.bc(), 0);
    assert_eq!(cpu.hl(), 0x1008);
    assert_eq!(cpu.de(), 0x2008);
    assert_eq!(cpu.f() & (PF | HF | NF), 0);
    assert_eq!(cpu.pc(), 0x0002);
    assert_eq!(cpu.instructions(), 1, "the whole repeat is one instruction");
}

#[test]
fn test_lddr_copies_downward() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xB8], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x1003);
        regs.set_de(0x2003);
        regs.set_bc(4);
    });
    bus.load(0x1000, &[0xA, 0xB, 0xC, 0xD]);

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(
        [bus.peek(0x2000), bus.peek(0x2001), bus.peek(0x2002), bus.peek(0x2003)],
        [0xA, 0xB, 0xC, 0xD]
    );
    assert_eq!(cpu.hl(), 0x0FFF);
    assert_eq!(cpu.de(), 0x1FFF);
}

#[test]
fn test_ldi_single_step_sets_pv_while_bc_nonzero() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xA0, 0xED, 0xA0], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x1000);
        regs.set_de(0x2000);
        regs.set_bc(2);
    });
    bus.load(0x1000, &[0x11, 0x22]);

    cpu.step(&mut bus, 1).unwrap();
    assert_eq!(cpu.bc(), 1);
    assert_eq!(cpu.f() & PF, PF);

    cpu.step(&mut bus, 1).unwrap();
    assert_eq!(cpu.bc(), 0);
    assert_eq!(cpu.f() & PF, 0);
    assert_eq!(bus.peek(0x2001), 0x22);
}

#[test]
fn test_cpir_missing_byte_runs_to_zero() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xB1], |cpu| {
        let regs = cpu.regs_mut();
        regs.a = 0x55;
        regs.f = CF;
        regs.set_hl(0x1000);
        regs.set_bc(4);
    });
    bus.load(0x1000, &[1, 2, 3, 4]);

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(cpu.bc(), 0);
    assert_eq!(cpu.hl(), 0x1004);
    assert_eq!(cpu.f() & (PF | ZF), 0);
    assert_eq!(cpu.f() & (NF | CF), NF | CF, "carry survives the compare");
}

#[test]
fn test_cpir_stops_on_match() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xB1], |cpu| {
        let regs = cpu.regs_mut();
        regs.a = 3;
        regs.f = 0;
        regs.set_hl(0x1000);
        regs.set_bc(4);
    });
    bus.load(0x1000, &[1, 2, 3, 4]);

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(cpu.hl(), 0x1003, "HL points past the match");
    assert_eq!(cpu.bc(), 1);
    assert_eq!(cpu.f() & (ZF | PF | CF), ZF | PF);
}

#[test]
fn test_cpd_steps_down() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xA9], |cpu| {
        let regs = cpu.regs_mut();
        regs.a = 0x10;
        regs.set_hl(0x1001);
        regs.set_bc(1);
    });
    bus.poke(0x1001, 0x20);

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(cpu.hl(), 0x1000);
    assert_eq!(cpu.bc(), 0);
    assert_eq!(cpu.a(), 0x10, "compare leaves A alone");
    assert_eq!(cpu.f() & (SF | ZF | PF | NF), SF | NF);
}

#[test]
fn test_ldir_with_zero_count_wraps() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xB0], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x8000);
        regs.set_de(0x8000);
        regs.set_bc(0);
    });

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(cpu.bc(), 0);
    assert_eq!(cpu.hl(), 0x8000, "65536 iterations wrap HL back");
    assert_eq!(cpu.de(), 0x8000);
}

#[test]
fn test_otir_decrements_b_before_output() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xB3], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x1000);
        regs.b = 3;
        regs.c = 0x10;
    });
    bus.load(0x1000, &[0xA1, 0xA2, 0xA3]);

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(
        bus.port_writes(),
        &[(0x0210, 0xA1), (0x0110, 0xA2), (0x0010, 0xA3)]
    );
    assert_eq!(cpu.regs().b, 0);
    assert_eq!(cpu.hl(), 0x1003);
    assert_eq!(cpu.f() & (ZF | NF), ZF | NF);
}

#[test]
fn test_inir_fills_memory() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xB2], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x3000);
        regs.b = 2;
        regs.c = 0x20;
    });
    bus.queue_input(0x20, &[0xAA, 0xBB]);

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(bus.peek(0x3000), 0xAA);
    assert_eq!(bus.peek(0x3001), 0xBB);
    assert_eq!(cpu.regs().b, 0);
    assert_eq!(cpu.f() & (ZF | NF), ZF | NF);
}

#[test]
fn test_repeating_block_io_ends_with_z_and_n() {
    for op in [0xB2_u8, 0xBA, 0xB3, 0xBB] {
        let (mut cpu, mut bus) = prepare(&[0xED, op], |cpu| {
            let regs = cpu.regs_mut();
            regs.set_hl(0x3000);
            regs.b = 3;
            regs.c = 0x20;
            regs.f = CF;
        });

        cpu.step(&mut bus, 1).unwrap();

        assert_eq!(cpu.regs().b, 0, "ED {op:02X}");
        assert_eq!(cpu.f() & (ZF | NF | CF), ZF | NF | CF, "ED {op:02X}");
    }
}

#[test]
fn test_ind_single_step() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0xAA], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x3001);
        regs.b = 2;
        regs.c = 0x20;
    });
    bus.set_port(0x20, 0x77);

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(bus.peek(0x3001), 0x77);
    assert_eq!(cpu.hl(), 0x3000);
    assert_eq!(cpu.regs().b, 1);
    assert_eq!(cpu.f() & (ZF | NF), NF);
}

#[test]
fn test_in_r_c_sets_flags() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x50], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_bc(0x1234);
        regs.f = CF | HF | NF;
    });
    bus.set_port(0x34, 0x00);

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(cpu.regs().d, 0x00);
    assert_eq!(cpu.f() & (ZF | PF | HF | NF | CF), ZF | PF | CF);
}

#[test]
fn test_out_c_r_uses_bc() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x79], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_bc(0xAB12);
        regs.a = 0x5A;
    });

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(bus.port_writes(), &[(0xAB12, 0x5A)]);
}

#[test]
fn test_sbc_hl_sets_full_flags() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x52], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x8000);
        regs.set_de(0x0000);
        regs.f = CF;
    });

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(cpu.hl(), 0x7FFF);
    assert_eq!(cpu.f() & (SF | ZF | HF | PF | NF | CF), HF | PF | NF);
}

#[test]
fn test_adc_hl_hl() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x6A], |cpu| {
        let regs = cpu.regs_mut();
        regs.set_hl(0x8000);
        regs.f = 0;
    });

    cpu.step(&mut bus, 1).unwrap();

    assert_eq!(cpu.hl(), 0x0000);
    assert_eq!(cpu.f() & (SF | ZF | HF | PF | NF | CF), ZF | PF | CF);
}

#[test]
fn test_ld_nn_rp_forms() {
    let (mut cpu, mut bus) = prepare(
        &[
            0xED, 0x43, 0x00, 0x40, // LD (0x4000), BC
            0xED, 0x63, 0x02, 0x40, // LD (0x4002), HL
            0xED, 0x7B, 0x00, 0x40, // LD SP, (0x4000)
            0xED, 0x5B, 0x02, 0x40, // LD DE, (0x4002)
        ],
        |cpu| {
            let regs = cpu.regs_mut();
            regs.set_bc(0x1234);
            regs.set_hl(0xBEEF);
        },
    );

    cpu.step(&mut bus, 4).unwrap();

    assert_eq!(bus.peek(0x4000), 0x34);
    assert_eq!(bus.peek(0x4001), 0x12);
    assert_eq!(cpu.sp(), 0x1234);
    assert_eq!(cpu.de(), 0xBEEF);
    assert_eq!(cpu.pc(), 16);
}

#[test]
fn test_neg() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x44, 0xED, 0x44], |cpu| {
        cpu.regs_mut().a = 0x01;
    });

    cpu.step(&mut bus, 1).unwrap();
    assert_eq!(cpu.a(), 0xFF);
    assert_eq!(cpu.f() & (SF | NF | CF), SF | NF | CF);

    cpu.regs_mut().a = 0x80;
    cpu.step(&mut bus, 1).unwrap();
    assert_eq!(cpu.a(), 0x80);
    assert_eq!(cpu.f() & PF, PF, "negating 0x80 overflows");
}

#[test]
fn test_interrupt_mode_and_registers() {
    let (mut cpu, mut bus) = prepare(
        &[
            0xED, 0x5E, // IM 2
            0xED, 0x47, // LD I, A
            0xFB,       // EI
            0xED, 0x57, // LD A, I
        ],
        |cpu| cpu.regs_mut().a = 0x80,
    );

    cpu.step(&mut bus, 4).unwrap();

    let regs = cpu.regs();
    assert_eq!(regs.im, 2);
    assert_eq!(regs.i, 0x80);
    assert_eq!(regs.a, 0x80);
    assert_eq!(regs.f & (SF | ZF | HF | PF | NF), SF | PF, "P/V reports IFF2");
}

#[test]
fn test_ld_a_r_reports_iff2_clear() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x4F, 0xED, 0x5F], |cpu| {
        cpu.regs_mut().a = 0x00;
    });

    cpu.step(&mut bus, 2).unwrap();

    assert_eq!(cpu.regs().r, 0x00);
    assert_eq!(cpu.f() & (ZF | PF), ZF);
}

#[test]
fn test_retn_restores_iff1() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x45], |cpu| {
        let regs = cpu.regs_mut();
        regs.sp = 0x8000;
        regs.iff1 = false;
        regs.iff2 = true;
    });
    bus.load(0x8000, &[0x34, 0x12]);

    cpu.step(&mut bus, 1).unwrap();

    assert!(cpu.regs().iff1);
    assert_eq!(cpu.pc(), 0x1234);
    assert_eq!(cpu.sp(), 0x8002);
}

#[test]
fn test_reti_is_plain_return() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x4D], |cpu| {
        let regs = cpu.regs_mut();
        regs.sp = 0x8000;
        regs.iff2 = true;
    });
    bus.load(0x8000, &[0x00, 0x20]);

    cpu.step(&mut bus, 1).unwrap();

    assert!(!cpu.regs().iff1);
    assert_eq!(cpu.pc(), 0x2000);
}

#[test]
fn test_rrd_rld() {
    let (mut cpu, mut bus) = prepare(&[0xED, 0x67, 0xED, 0x6F], |cpu| {
        let regs = cpu.regs_mut();
        regs.a = 0x12;
        regs.set_hl(0x5000);
    });
    bus.poke(0x5000, 0x34);

    cpu.step(&mut bus, 1).unwrap();
    assert_eq!(cpu.a(), 0x14);
    assert_eq!(bus.peek(0x5000), 0x23);

    // RLD undoes RRD
    cpu.step(&mut bus, 1).unwrap();
    assert_eq!(cpu.a(), 0x12);
    assert_eq!(bus.peek(0x5000), 0x34);
    assert_eq!(cpu.f() & (HF | NF | PF), PF);
}
