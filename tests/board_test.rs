use minesweeper_arena::{
    data::{Board, Cell, ClientId, DANGER_SCORE, EXPLORE_SCORE, MINE_SCORE},
    error::GameError,
};
use proptest::prelude::*;

/// Board with a hand-picked mine layout, for deterministic scoring checks.
fn fixed_board(width: usize, height: usize, mine_positions: &[(usize, usize)]) -> Board {
    let mut mines = vec![false; width * height];
    for &(col, row) in mine_positions {
        mines[col + row * width] = true;
    }
    let cells = (0..width * height)
        .map(|i| Cell {
            is_mine: mines[i],
            mines_around: count_neighbors(
                &|c, r| mines[c + r * width],
                i % width,
                i / width,
                width,
                height,
            ),
            explorer: None,
        })
        .collect();
    Board {
        width,
        height,
        mine_count: mine_positions.len(),
        fields_left: width * height - mine_positions.len(),
        cells,
    }
}

fn count_neighbors(
    is_mine: &dyn Fn(usize, usize) -> bool,
    col: usize,
    row: usize,
    width: usize,
    height: usize,
) -> u8 {
    let mut count = 0;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (c, r) = (col as i64 + dx, row as i64 + dy);
            if c >= 0
                && r >= 0
                && (c as usize) < width
                && (r as usize) < height
                && is_mine(c as usize, r as usize)
            {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn rejects_invalid_dimensions() {
    for (width, height, mines) in [
        (0, 5, 0),
        (5, 0, 0),
        (-1, 5, 0),
        (5, 5, -1),
        (65, 5, 0),
        (5, 65, 0),
        (3, 3, 4),
    ] {
        let result = Board::new(width, height, mines);
        assert!(
            matches!(result, Err(GameError::InvalidDimensions(_))),
            "{width}x{height} with {mines} mines was accepted"
        );
    }
}

#[test]
fn accepts_boundary_dimensions() {
    assert!(Board::new(1, 1, 0).is_ok());
    assert!(Board::new(64, 64, 0).is_ok());
    assert!(Board::new(3, 3, 3).is_ok());
}

#[test]
fn from_spec_parses_and_defaults_mine_count() {
    let board = Board::from_spec("10 10").unwrap();
    assert_eq!((board.width, board.height, board.mine_count), (10, 10, 20));

    let board = Board::from_spec("4 4 2").unwrap();
    assert_eq!(board.mine_count, 2);

    for bad in ["", "4", "4 4 2 9", "a 4", "4 b", "4 4 c"] {
        assert!(
            matches!(Board::from_spec(bad), Err(GameError::InvalidDimensions(_))),
            "spec {bad:?} was accepted"
        );
    }
}

#[test]
fn serialized_adjacency_matches_mine_layout() {
    let mut board = Board::new(8, 8, 10).unwrap();
    let who = ClientId(7);
    for col in 0..8 {
        for row in 0..8 {
            board.click(who, col, row).unwrap();
        }
    }

    let serialized = board.serialize();
    let tokens: Vec<&str> = serialized.split(' ').collect();
    assert_eq!(&tokens[..3], &["8", "8", "10"]);
    assert_eq!(tokens.len(), 3 + 64);

    // Column-major: token index 3 + col*height + row.
    let mine_at = |col: usize, row: usize| tokens[3 + col * 8 + row].starts_with('X');
    for col in 0..8 {
        for row in 0..8 {
            let token = tokens[3 + col * 8 + row];
            assert_eq!(&token[1..], "7", "explorer id missing in {token}");
            if token.starts_with('X') {
                continue;
            }
            let digit = token.chars().next().unwrap().to_digit(10).unwrap() as u8;
            assert_eq!(
                digit,
                count_neighbors(&mine_at, col, row, 8, 8),
                "adjacency mismatch at ({col}, {row})"
            );
        }
    }
}

#[test]
fn unexplored_cells_serialize_as_underscore() {
    let board = Board::new(4, 4, 2).unwrap();
    let serialized = board.serialize();
    let tokens: Vec<&str> = serialized.split(' ').collect();
    assert!(tokens[3..].iter().all(|t| *t == "_"));
}

#[test]
fn first_explore_scores_against_the_layout() {
    let mut board = fixed_board(4, 4, &[(3, 0), (3, 1)]);
    let ann = ClientId(1);

    // Nothing explored anywhere yet: the fully-unseen bonus applies.
    let bonus = -MINE_SCORE * 2 / 14;
    let outcome = board.click(ann, 0, 0).unwrap();
    assert_eq!(outcome.score, bonus);
    assert_eq!(outcome.token, "01");
    assert_eq!(board.fields_left, 13);

    // (1, 1) touches the explored (0, 0): plain explore score, no mines near.
    let outcome = board.click(ann, 1, 1).unwrap();
    assert_eq!(outcome.score, EXPLORE_SCORE);

    // (2, 1) touches (1, 1) and sees both mines.
    let outcome = board.click(ann, 2, 1).unwrap();
    assert_eq!(outcome.score, EXPLORE_SCORE + 2 * DANGER_SCORE);

    // Mines keep their fields_left untouched and cost MINE_SCORE.
    let before = board.fields_left;
    let outcome = board.click(ann, 3, 0).unwrap();
    assert_eq!(outcome.score, MINE_SCORE);
    assert_eq!(outcome.token, "X1");
    assert_eq!(board.fields_left, before);
}

#[test]
fn repeated_click_scores_zero_and_changes_nothing() {
    let mut board = fixed_board(4, 4, &[(3, 3)]);
    let ann = ClientId(1);
    let bob = ClientId(2);

    board.click(ann, 0, 0).unwrap();
    let snapshot = board.serialize();
    let fields_left = board.fields_left;

    let outcome = board.click(bob, 0, 0).unwrap();
    assert_eq!(outcome.score, 0);
    // The original explorer keeps the cell.
    assert!(outcome.token.ends_with('1'));
    assert_eq!(board.serialize(), snapshot);
    assert_eq!(board.fields_left, fields_left);
}

#[test]
fn out_of_bounds_click_is_rejected_and_harmless() {
    let mut board = fixed_board(4, 4, &[(3, 3)]);
    let snapshot = board.serialize();

    for (col, row) in [(-1, 0), (0, -1), (4, 0), (0, 4), (i64::MIN, i64::MAX)] {
        let result = board.click(ClientId(1), col, row);
        assert_eq!(result, Err(GameError::OutOfBounds { col, row }));
    }
    assert_eq!(board.serialize(), snapshot);
    assert_eq!(board.fields_left, 15);
}

#[test]
fn unseen_bonus_balances_mine_penalties() {
    // The bonus is sized so that (n - m) unseen explores repay m mine hits,
    // up to integer truncation.
    for (width, height, mine_count) in [(8i64, 8i64, 12i64), (5, 5, 8), (10, 3, 10), (4, 4, 2)] {
        let mut board = Board::new(width, height, mine_count).unwrap();
        let safe = width * height - mine_count;

        // Nothing is explored yet, so the first safe click earns the bonus.
        let idx = board.cells.iter().position(|c| !c.is_mine).unwrap();
        let (col, row) = ((idx % board.width) as i64, (idx / board.width) as i64);
        let bonus = board.click(ClientId(1), col, row).unwrap().score;

        assert!(safe * bonus <= -MINE_SCORE * mine_count);
        assert!(-MINE_SCORE * mine_count < safe * (bonus + 1));
    }
}

#[test]
fn mine_placement_is_statistically_uniform() {
    let rounds = 2000u32;
    let mut hits = [0u32; 16];
    for _ in 0..rounds {
        let board = Board::new(4, 4, 4).unwrap();
        for (i, cell) in board.cells.iter().enumerate() {
            if cell.is_mine {
                hits[i] += 1;
            }
        }
    }

    // Each cell carries a mine with p = 1/4; expect 500 hits each. The band
    // is ~10 standard deviations wide, so a correct generator essentially
    // never trips it while a biased one does.
    let expected = (rounds / 4) as i64;
    for (i, &h) in hits.iter().enumerate() {
        let deviation = (h as i64 - expected).abs();
        assert!(
            deviation < 200,
            "cell {i} got {h} mines across {rounds} boards, expected about {expected}"
        );
    }
}

fn valid_dimensions() -> impl Strategy<Value = (i64, i64, i64)> {
    (1i64..=64, 1i64..=64).prop_flat_map(|(w, h)| (Just(w), Just(h), 0i64..=w * h / 3))
}

proptest! {
    #[test]
    fn construction_places_exactly_the_requested_mines(
        (width, height, mine_count) in valid_dimensions()
    ) {
        let board = Board::new(width, height, mine_count).unwrap();
        let mines = board.cells.iter().filter(|c| c.is_mine).count();
        prop_assert_eq!(mines, mine_count as usize);
        prop_assert_eq!(board.fields_left, (width * height - mine_count) as usize);
        prop_assert!(board.cells.iter().all(|c| c.mines_around <= 8 && c.explorer.is_none()));
    }

    #[test]
    fn game_over_exactly_after_the_last_safe_cell(
        order in Just((0..25usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let mut board = Board::new(5, 5, 6).unwrap();
        let who = ClientId(1);
        let safe_total = 25 - 6;
        let mut safe_clicked = 0;

        for idx in order {
            let was_mine = board.cells[idx].is_mine;
            board.click(who, (idx % 5) as i64, (idx / 5) as i64).unwrap();
            if !was_mine {
                safe_clicked += 1;
            }
            prop_assert_eq!(board.is_game_over(), safe_clicked == safe_total);
        }
    }
}
