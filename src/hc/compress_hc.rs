//! HC main compression loop.
//!
//! This module implements the hash-chain (HC) lazy-matching compression loop:
//!
//! - **[`compress_hash_chain`]** — a greedy match selector that considers up to
//!   three overlapping matches at a time, choosing the best pair to emit.
//!   Used at all compression levels this crate builds.
//!
//! It supports three output-limit modes (`NotLimited`, `LimitedOutput`,
//! `FillOutput`) and optional dictionary context (`DictCtxDirective`).
//!
//! See `lz4hc.c` in the LZ4 reference implementation for the authoritative
//! algorithm description.

use super::encode::encode_sequence;
use super::search::{insert_and_find_best_match, insert_and_get_wider_match, HcFavor};
use super::types::{DictCtxDirective, HcCCtxInternal, Match, OPTIMAL_ML};
use crate::block::types::{
    self as bt, LimitedOutputDirective, LASTLITERALS, MFLIMIT, MINMATCH, ML_MASK, RUN_MASK,
};

/// Minimum source size below which no matches are searched; all bytes are
/// emitted as literals.  Equals `MFLIMIT + 1 = 13` per the LZ4 spec.
const LZ4_MIN_LENGTH: usize = MFLIMIT + 1;

// ─────────────────────────────────────────────────────────────────────────────
// SearchState
// ─────────────────────────────────────────────────────────────────────────────

/// Selects the entry point on each iteration of `'search_loop` in
/// [`compress_hash_chain`].
///
/// `S2` re-evaluates the second candidate match; `S3` skips directly to
/// evaluating the third, reusing the second match unchanged.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SearchState {
    S2,
    S3,
}

// ─────────────────────────────────────────────────────────────────────────────
// compress_hash_chain
// ─────────────────────────────────────────────────────────────────────────────

/// Greedy HC compression loop for levels 1–8 (`LZ4HC_compress_hashChain` in
/// `lz4hc.c`).
///
/// Each iteration inserts the current position into the hash chain, searches
/// for the best match, then speculatively looks one or two positions ahead to
/// decide whether a longer overlapping match produces better compression before
/// emitting any sequence.
///
/// On success writes compressed bytes to `dest` and updates `*src_size_ptr`
/// to the number of source bytes consumed.  Returns the number of bytes
/// written, or `0` on compression failure (only possible in `LimitedOutput`
/// mode).
///
/// # Safety
/// - `source` must be valid for reads of `*src_size_ptr` bytes.
/// - `dest` must be valid for writes of `max_output_size` bytes.
/// - `ctx` must have been initialised with `init_internal`.
#[allow(clippy::too_many_arguments)]
pub unsafe fn compress_hash_chain(
    ctx: &mut HcCCtxInternal,
    source: *const u8,
    dest: *mut u8,
    src_size_ptr: &mut i32,
    max_output_size: i32,
    max_nb_attempts: i32,
    limit: LimitedOutputDirective,
    dict: DictCtxDirective,
) -> i32 {
    let input_size = *src_size_ptr;
    let pattern_analysis = max_nb_attempts > 64; // levels 8+

    let mut ip: *const u8 = source;
    let mut anchor: *const u8 = ip;
    let iend: *const u8 = ip.add(input_size as usize);
    let mflimit: *const u8 = iend.sub(MFLIMIT);
    let matchlimit: *const u8 = iend.sub(LASTLITERALS);

    let mut optr: *mut u8 = dest;
    let mut op: *mut u8 = dest;
    let mut oend: *mut u8 = op.add(max_output_size as usize);

    let nomatch = Match {
        len: 0,
        off: 0,
        back: 0,
    };

    // Saved state across search iterations within one outer-loop pass
    let mut start0: *const u8 = core::ptr::null();
    let mut start2: *const u8 = core::ptr::null();
    let mut start3: *const u8 = core::ptr::null();
    let mut m0 = nomatch;
    let mut m1 = nomatch;
    let mut m2 = nomatch;
    let mut m3 = nomatch;

    // Overflow state: captures m1 and optr at the time of dest_overflow
    let mut overflow_occurred = false;
    let mut overflow_m1 = nomatch;

    *src_size_ptr = 0;

    if limit == LimitedOutputDirective::FillOutput {
        // The LZ4 frame format requires LASTLITERALS bytes of headroom at
        // the end; shorten the effective output limit so encode_sequence
        // never writes into that reserved region.  The limit is restored
        // before writing the final literal run.
        oend = oend.sub(LASTLITERALS);
    }

    // Short inputs carry no matches; jump straight to the final literal run.
    if input_size >= LZ4_MIN_LENGTH as i32 {
        // ── Main compression loop ─────────────────────────────────────────
        'compress_loop: while ip <= mflimit {
            m1 = insert_and_find_best_match(
                ctx,
                ip,
                matchlimit,
                max_nb_attempts,
                pattern_analysis,
                dict,
            );
            if m1.len < MINMATCH as i32 {
                ip = ip.add(1);
                continue 'compress_loop;
            }

            start0 = ip;
            m0 = m1;

            // ── Lookahead loop ────────────────────────────────────────────
            //
            // Speculatively search for a second match (m2) starting near the
            // end of m1, and a third (m3) near the end of m2.  If a later
            // match is strictly better, we delay emitting the earlier one and
            // shift the window forward.  `SearchState` controls whether we
            // re-evaluate the second candidate or skip straight to the third
            // on the next iteration.
            let mut search_state = SearchState::S2;

            'search_loop: loop {
                // ── Step S2: search for a second candidate match near the end of m1.
                if search_state == SearchState::S2 {
                    if ip.add(m1.len as usize) <= mflimit {
                        start2 = ip.add(m1.len as usize - 2);
                        m2 = insert_and_get_wider_match(
                            ctx,
                            start2,
                            ip, // i_low_limit
                            matchlimit,
                            m1.len,
                            max_nb_attempts,
                            pattern_analysis,
                            false, // chain_swap = 0
                            dict,
                            false, // favorCompressionRatio
                        );
                        start2 = start2.offset(m2.back as isize);
                    } else {
                        m2 = nomatch;
                    }

                    if m2.len <= m1.len {
                        // No better match → encode m1 immediately.
                        optr = op;
                        if encode_sequence(
                            &mut ip,
                            &mut op,
                            &mut anchor,
                            m1.len,
                            m1.off,
                            limit,
                            oend,
                        )
                        .is_err()
                        {
                            overflow_m1 = m1;
                            overflow_occurred = true;
                            break 'compress_loop;
                        }
                        continue 'compress_loop;
                    }

                    if start0 < ip {
                        // First match was skipped at least once: restore if m2 squeezes m0.
                        if start2 < ip.add(m0.len as usize) {
                            ip = start0;
                            m1 = m0;
                        }
                    }

                    if (start2.offset_from(ip) as i32) < 3 {
                        // m1 is too short to be worth emitting on its own;
                        // promote m2 to m1 and search for a new m2.
                        ip = start2;
                        m1 = m2;
                        search_state = SearchState::S2;
                        continue 'search_loop;
                    }
                }

                // Default back to S2 for the next iteration unless S3 is selected below.
                search_state = SearchState::S2;

                // ── Step S3: optionally shorten m1 so that m2 fits before m3.
                // Possibly shorten m1 so that m2 fits after it.
                if (start2.offset_from(ip) as i32) < OPTIMAL_ML {
                    let mut new_ml = m1.len.min(OPTIMAL_ML);
                    let ml_limit = (start2.offset_from(ip) as i32) + m2.len - MINMATCH as i32;
                    if new_ml > ml_limit {
                        new_ml = ml_limit;
                    }
                    let correction = new_ml - (start2.offset_from(ip) as i32);
                    if correction > 0 {
                        start2 = start2.add(correction as usize);
                        m2.len -= correction;
                    }
                }

                if start2.add(m2.len as usize) <= mflimit {
                    start3 = start2.add(m2.len as usize - 3);
                    m3 = insert_and_get_wider_match(
                        ctx,
                        start3,
                        start2, // i_low_limit
                        matchlimit,
                        m2.len,
                        max_nb_attempts,
                        pattern_analysis,
                        false, // chain_swap = 0
                        dict,
                        false, // favorCompressionRatio
                    );
                    start3 = start3.offset(m3.back as isize);
                } else {
                    m3 = nomatch;
                }

                if m3.len <= m2.len {
                    // No better match → encode m1 and m2.
                    if start2 < ip.add(m1.len as usize) {
                        m1.len = start2.offset_from(ip) as i32;
                    }
                    optr = op;
                    if encode_sequence(&mut ip, &mut op, &mut anchor, m1.len, m1.off, limit, oend)
                        .is_err()
                    {
                        overflow_m1 = m1;
                        overflow_occurred = true;
                        break 'compress_loop;
                    }
                    ip = start2;
                    optr = op;
                    if encode_sequence(&mut ip, &mut op, &mut anchor, m2.len, m2.off, limit, oend)
                        .is_err()
                    {
                        overflow_m1 = m2; // m1 was already advanced to m2 position
                        overflow_occurred = true;
                        break 'compress_loop;
                    }
                    continue 'compress_loop;
                }

                if start3 < ip.add(m1.len as usize + 3) {
                    if start3 >= ip.add(m1.len as usize) {
                        // Can write Seq1 immediately: Seq2 removed, Seq3 becomes Seq1.
                        if start2 < ip.add(m1.len as usize) {
                            let correction = (ip.add(m1.len as usize)).offset_from(start2) as i32;
                            start2 = start2.add(correction as usize);
                            m2.len -= correction;
                            if m2.len < MINMATCH as i32 {
                                start2 = start3;
                                m2 = m3;
                            }
                        }
                        optr = op;
                        if encode_sequence(
                            &mut ip,
                            &mut op,
                            &mut anchor,
                            m1.len,
                            m1.off,
                            limit,
                            oend,
                        )
                        .is_err()
                        {
                            overflow_m1 = m1;
                            overflow_occurred = true;
                            break 'compress_loop;
                        }
                        ip = start3;
                        m1 = m3;
                        start0 = start2;
                        m0 = m2;
                        search_state = SearchState::S2;
                        continue 'search_loop;
                    }
                    // m2 does not fit before m3; skip m2 and retry with m3 as the new m2.
                    start2 = start3;
                    m2 = m3;
                    search_state = SearchState::S3;
                    continue 'search_loop;
                }

                // OK: we have 3 ascending matches; write m1.
                if start2 < ip.add(m1.len as usize) {
                    if (start2.offset_from(ip) as i32) < OPTIMAL_ML {
                        if m1.len > OPTIMAL_ML {
                            m1.len = OPTIMAL_ML;
                        }
                        let ml_limit = (start2.offset_from(ip) as i32) + m2.len - MINMATCH as i32;
                        if m1.len > ml_limit {
                            m1.len = ml_limit;
                        }
                        let correction = m1.len - (start2.offset_from(ip) as i32);
                        if correction > 0 {
                            start2 = start2.add(correction as usize);
                            m2.len -= correction;
                        }
                    } else {
                        m1.len = start2.offset_from(ip) as i32;
                    }
                }
                optr = op;
                if encode_sequence(&mut ip, &mut op, &mut anchor, m1.len, m1.off, limit, oend)
                    .is_err()
                {
                    overflow_m1 = m1;
                    overflow_occurred = true;
                    break 'compress_loop;
                }

                // Slide the window: emit m1, then promote m2→m1 and m3→m2,
                // and search for a new m3 on the next iteration.
                ip = start2;
                m1 = m2;
                start2 = start3;
                m2 = m3;
                search_state = SearchState::S3;
                continue 'search_loop;
            } // 'search_loop
        } // 'compress_loop

        // ── Output overflow: recover partial match when filling output ─────
        if overflow_occurred {
            m1 = overflow_m1;
            if limit == LimitedOutputDirective::FillOutput {
                // Assumption: ip, anchor, optr, m1 are set correctly.
                let ll = ip.offset_from(anchor) as usize;
                let ll_addbytes = (ll + 240) / 255;
                let ll_total_cost = 1 + ll_addbytes + ll;
                // 2 for offset, 1 for token
                let max_lit_pos: *mut u8 = oend.sub(3);

                op = optr; // restore correct out pointer
                if op.add(ll_total_cost) <= max_lit_pos {
                    let bytes_left_for_ml = max_lit_pos.offset_from(op.add(ll_total_cost)) as usize;
                    let max_ml_size = MINMATCH + (ML_MASK as usize - 1) + bytes_left_for_ml * 255;
                    debug_assert!(m1.len >= 0);
                    if m1.len as usize > max_ml_size {
                        m1.len = max_ml_size as i32;
                    }
                    // (oend + LASTLITERALS) - (op + ll_total_cost + 2) - 1 + m1.len >= MFLIMIT
                    let room =
                        oend.add(LASTLITERALS)
                            .offset_from(op.add(ll_total_cost + 2)) as i32
                            - 1
                            + m1.len;
                    if room >= MFLIMIT as i32 {
                        // Best-effort encode; ignore error (notLimited mode).
                        let _ = encode_sequence(
                            &mut ip,
                            &mut op,
                            &mut anchor,
                            m1.len,
                            m1.off,
                            LimitedOutputDirective::NotLimited,
                            oend,
                        );
                    }
                }
                // Fall through to write the final literal run.
            } else {
                // LimitedOutput mode: output is full; report failure.
                return 0;
            }
        }
    } // end if (input_size >= LZ4_MIN_LENGTH)

    // ── Final literal run ─────────────────────────────────────────────────────
    {
        let mut last_run_size = iend.offset_from(anchor) as usize;
        let ll_add = (last_run_size + 255 - RUN_MASK as usize) / 255;
        let total_size = 1 + ll_add + last_run_size;

        if limit == LimitedOutputDirective::FillOutput {
            oend = oend.add(LASTLITERALS); // restore the full output boundary before writing the last run
        }

        if limit != LimitedOutputDirective::NotLimited && op.add(total_size) > oend {
            if limit == LimitedOutputDirective::LimitedOutput {
                return 0;
            }
            // FillOutput: truncate the final literal run to exactly fill remaining space.
            let remaining = oend.offset_from(op);
            if remaining < 2 {
                // Not enough room even for the token byte + 1 literal
                return op.offset_from(dest) as i32;
            }
            last_run_size = remaining as usize - 1; // 1 for token
            let ll_add2 = (last_run_size + 256 - RUN_MASK as usize) / 256;
            last_run_size -= ll_add2;
        }

        ip = anchor.add(last_run_size); // may end before `iend` in FillOutput mode

        if last_run_size >= RUN_MASK as usize {
            let mut accumulator = last_run_size - RUN_MASK as usize;
            *op = (RUN_MASK << bt::ML_BITS) as u8;
            op = op.add(1);
            while accumulator >= 255 {
                *op = 255u8;
                op = op.add(1);
                accumulator -= 255;
            }
            *op = accumulator as u8;
            op = op.add(1);
        } else {
            *op = (last_run_size << bt::ML_BITS as usize) as u8;
            op = op.add(1);
        }
        core::ptr::copy_nonoverlapping(anchor, op, last_run_size);
        op = op.add(last_run_size);
    }

    // End
    *src_size_ptr = ip.offset_from(source) as i32;
    op.offset_from(dest) as i32
}
