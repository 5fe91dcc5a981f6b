// Unit tests for task-012: HC external-dictionary handling and top-level
// compression dispatch (src/hc/dispatch.rs).
//
// Coverage:
//   - HcCCtxInternal::is_compatible: always true (single-strategy crate)
//   - set_external_dict: rotates the prefix window into the dict slot
//   - compress_generic: routes through the no-dict-ctx path and produces
//     valid compressed output

use lz4hc::block::types::LimitedOutputDirective;
use lz4hc::hc::dispatch::{compress_generic, set_external_dict};
use lz4hc::hc::types::{init_internal, HcCCtxInternal};

unsafe fn make_ctx(buf: &[u8]) -> HcCCtxInternal {
    let mut ctx = HcCCtxInternal::new();
    init_internal(&mut ctx, buf.as_ptr());
    ctx.end = buf.as_ptr().add(buf.len());
    ctx
}

#[test]
fn is_compatible_is_always_true() {
    let a = HcCCtxInternal::new();
    let b = HcCCtxInternal::new();
    assert!(a.is_compatible(&b));
}

#[test]
fn set_external_dict_rotates_prefix_into_dict_slot() {
    let buf = vec![0xAAu8; 128];
    unsafe {
        let mut ctx = make_ctx(&buf);
        let old_prefix = ctx.prefix_start;
        let old_end = ctx.end;

        let new_block = buf.as_ptr().add(128);
        set_external_dict(&mut ctx, new_block);

        assert_eq!(ctx.dict_start, old_prefix);
        assert_eq!(
            ctx.dict_limit,
            (old_end as usize - old_prefix as usize) as u32
        );
        assert_eq!(ctx.low_limit, 0);
        assert_eq!(ctx.prefix_start, new_block);
        assert_eq!(ctx.end, new_block);
        assert_eq!(ctx.next_to_update, ctx.dict_limit);
        assert!(ctx.dict_ctx.is_null());
    }
}

#[test]
fn compress_generic_no_dict_ctx_produces_output() {
    let input = vec![0x5Au8; 256];
    let mut output = vec![0u8; 512];

    unsafe {
        let mut ctx = make_ctx(&input);
        ctx.end = input.as_ptr();
        let mut src_size = input.len() as i32;

        let n = compress_generic(
            &mut ctx,
            input.as_ptr(),
            output.as_mut_ptr(),
            &mut src_size,
            output.len() as i32,
            3,
            LimitedOutputDirective::NotLimited,
        );

        assert!(n > 0, "compress_generic returned 0");
        assert_eq!(src_size, input.len() as i32);
    }
}

#[test]
fn compress_generic_rejects_oversized_input() {
    let mut ctx = HcCCtxInternal::new();
    let mut output = vec![0u8; 16];
    let mut src_size = i32::MAX;

    unsafe {
        let n = compress_generic(
            &mut ctx,
            core::ptr::null(),
            output.as_mut_ptr(),
            &mut src_size,
            output.len() as i32,
            3,
            LimitedOutputDirective::NotLimited,
        );
        assert_eq!(n, 0);
    }
}
