use super::*;
use common::Config;
use tempfile::tempdir;

fn config(max_bufs: usize) -> Config {
    Config::builder().max_bufs(max_bufs).build()
}

#[test]
fn create_open_alloc_write_reopen_reads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();

    let page_num = {
        let page = pf.alloc_page(fd).unwrap();
        page.data[0..4].copy_from_slice(&[9, 8, 7, 6]);
        page.page_num
    };
    pf.unfix_page(fd, page_num, true).unwrap();
    pf.close_file(fd).unwrap();

    let mut pf2 = PfManager::new(config(8));
    let fd2 = pf2.open_file(&path).unwrap();
    {
        let page = pf2.get_this_page(fd2, page_num).unwrap();
        assert_eq!(&page.data[0..4], &[9, 8, 7, 6]);
    }
    pf2.unfix_page(fd2, page_num, false).unwrap();
}

#[test]
fn double_pin_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();
    let page_num = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, page_num, true).unwrap();

    pf.get_this_page(fd, page_num).unwrap();
    let err = pf.get_this_page(fd, page_num).unwrap_err();
    assert!(matches!(err, PfError::PageFixed(_, _)));
}

#[test]
fn unfix_unpinned_page_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();
    let page_num = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, page_num, true).unwrap();

    let err = pf.unfix_page(fd, page_num, false).unwrap_err();
    assert!(matches!(err, PfError::PageUnfixed(_, _)));
}

#[test]
fn unfix_of_nonresident_page_is_idempotent_success() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();
    pf.unfix_page(fd, 0, false).unwrap();
}

#[test]
fn eviction_skips_pinned_frames_and_flushes_dirty_victims() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(2));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();

    let p0 = pf.alloc_page(fd).unwrap().page_num;
    pf.alloc_page(fd).unwrap();
    pf.get_this_page(fd, p0).unwrap();

    let p1 = {
        let page = pf.alloc_page(fd).unwrap();
        page.data[0] = 42;
        page.page_num
    };
    pf.unfix_page(fd, p1, true).unwrap();
    assert!(pf.stats().physical_writes >= 1);
}

#[test]
fn dispose_then_alloc_reuses_freed_page() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();

    let p0 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p0, true).unwrap();
    let p1 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p1, true).unwrap();

    pf.dispose_page(fd, p0).unwrap();
    let reused = pf.alloc_page(fd).unwrap().page_num;
    assert_eq!(reused, p0);
    pf.unfix_page(fd, reused, true).unwrap();
}

#[test]
fn disposing_an_already_free_page_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();
    let p0 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p0, true).unwrap();

    pf.dispose_page(fd, p0).unwrap();
    let err = pf.dispose_page(fd, p0).unwrap_err();
    assert!(matches!(err, PfError::PageFree(_, _)));
}

#[test]
fn disposing_an_out_of_range_page_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();
    pf.alloc_page(fd).unwrap();

    let err = pf.dispose_page(fd, 99).unwrap_err();
    assert!(matches!(err, PfError::InvalidPage(_, _)));
}

#[test]
fn closing_a_file_does_not_shrink_the_pool_for_later_files() {
    let dir = tempdir().unwrap();
    let mut pf = PfManager::new(config(2));

    let path_a = dir.path().join("a.db");
    pf.create_file(&path_a).unwrap();
    let fd_a = pf.open_file(&path_a).unwrap();
    let pa0 = pf.alloc_page(fd_a).unwrap().page_num;
    pf.unfix_page(fd_a, pa0, true).unwrap();
    let pa1 = pf.alloc_page(fd_a).unwrap().page_num;
    pf.unfix_page(fd_a, pa1, true).unwrap();
    pf.close_file(fd_a).unwrap();

    // Both of `a.db`'s frames are now closed and unoccupied. A second file
    // allocating up to the same capacity must be able to reclaim them
    // rather than spuriously failing with `NoBuf`.
    let path_b = dir.path().join("b.db");
    pf.create_file(&path_b).unwrap();
    let fd_b = pf.open_file(&path_b).unwrap();
    let pb0 = pf.alloc_page(fd_b).unwrap().page_num;
    pf.unfix_page(fd_b, pb0, true).unwrap();
    let pb1 = pf.alloc_page(fd_b).unwrap().page_num;
    pf.unfix_page(fd_b, pb1, true).unwrap();
    let pb2 = pf.alloc_page(fd_b).unwrap().page_num;
    pf.unfix_page(fd_b, pb2, true).unwrap();

    pf.get_this_page(fd_b, pb0).unwrap();
    pf.unfix_page(fd_b, pb0, false).unwrap();
}

#[test]
fn dispose_of_pinned_page_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();
    let p0 = pf.alloc_page(fd).unwrap().page_num;

    let err = pf.dispose_page(fd, p0).unwrap_err();
    assert!(matches!(err, PfError::PageFixed(_, _)));
}

#[test]
fn scan_skips_free_pages_and_reports_eof() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();

    let p0 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p0, true).unwrap();
    let p1 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p1, true).unwrap();
    let p2 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p2, true).unwrap();

    pf.dispose_page(fd, p1).unwrap();

    let first = pf.get_first_page(fd).unwrap().page_num;
    assert_eq!(first, p0);
    pf.unfix_page(fd, first, false).unwrap();

    let next = pf.get_next_page(fd, first).unwrap().page_num;
    assert_eq!(next, p2);
    pf.unfix_page(fd, next, false).unwrap();

    let eof = pf.get_next_page(fd, next).unwrap_err();
    assert!(matches!(eof, PfError::Eof));
}

#[test]
fn close_with_pinned_page_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();
    pf.alloc_page(fd).unwrap();

    let err = pf.close_file(fd).unwrap_err();
    assert!(matches!(err, PfError::PageFixed(_, _)));
}

#[test]
fn destroy_open_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let _fd = pf.open_file(&path).unwrap();

    let err = pf.destroy_file(&path).unwrap_err();
    assert!(matches!(err, PfError::FileOpen));
}

#[test]
fn logical_reads_counted_on_every_pin() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(8));
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();
    let p0 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p0, true).unwrap();

    pf.reset_stats();
    pf.get_this_page(fd, p0).unwrap();
    pf.unfix_page(fd, p0, false).unwrap();
    assert_eq!(pf.stats().logical_reads, 1);
}

#[test]
fn mru_strategy_evicts_the_most_recently_touched_frame() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut pf = PfManager::new(config(2));
    pf.set_strategy(Strategy::Mru);
    pf.create_file(&path).unwrap();
    let fd = pf.open_file(&path).unwrap();

    let p0 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p0, true).unwrap();
    let p1 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p1, true).unwrap();

    // p1 is most-recently touched; allocating a third page should evict it,
    // not p0.
    let p2 = pf.alloc_page(fd).unwrap().page_num;
    pf.unfix_page(fd, p2, true).unwrap();

    pf.get_this_page(fd, p0).unwrap();
    pf.unfix_page(fd, p0, false).unwrap();
}
