mod scoring_engine;

pub use scoring_engine::{
    points_by_media, points_for, rank_standings, total_points, weighted_points_sql, Standing,
};
