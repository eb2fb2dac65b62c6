mod board_service;

pub use board_service::{
    format_points, render_board, BoardRow, BoardSlots, BoardTarget, BOARD_ROWS, PAST_PICKS_LIMIT,
    UNKNOWN_MEMBER,
};
