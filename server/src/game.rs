use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Direction, GameState, PlayerState, Vec2, FOOD_SCORE, GRID_HEIGHT, GRID_WIDTH,
    INITIAL_BODY_LEN, MAX_PLAYERS,
};
use std::collections::VecDeque;

/// Fixed spawn point and heading per player slot. Opposing slots face each
/// other across the grid.
pub(crate) const SPAWN_TABLE: [(Vec2, Direction); MAX_PLAYERS] = [
    (Vec2 { x: 10, y: 10 }, Direction::Right),
    (Vec2 { x: 50, y: 10 }, Direction::Left),
    (Vec2 { x: 10, y: 30 }, Direction::Right),
    (Vec2 { x: 50, y: 30 }, Direction::Left),
];

#[derive(Debug, Clone)]
struct Player {
    id: u32,
    alive: bool,
    dir: Direction,
    body: VecDeque<Vec2>,
    score: u32,
}

/// The authoritative simulation. Owns all player and food state and a
/// per-instance random source, and is only ever touched from the simulate
/// loop; snapshots are deep copies that never alias live storage.
pub struct GameLogic {
    players: Vec<Player>,
    food: Vec<Vec2>,
    active: bool,
    rng: StdRng,
}

impl GameLogic {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministically seeded instance, for reproducible simulations.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        GameLogic {
            players: Vec::new(),
            food: Vec::new(),
            active: false,
            rng,
        }
    }

    /// Resets all state and starts a new game with up to `MAX_PLAYERS`
    /// players at the fixed spawn points, one food item per player.
    pub fn init(&mut self, player_count: usize) {
        self.players.clear();
        self.food.clear();
        self.active = true;

        let count = player_count.min(MAX_PLAYERS);
        for slot in 0..count {
            let (head, dir) = SPAWN_TABLE[slot];
            let (dx, dy) = dir.offset();

            // Body trails opposite the heading, head first.
            let mut body = VecDeque::with_capacity(INITIAL_BODY_LEN);
            for segment in 0..INITIAL_BODY_LEN as i32 {
                body.push_back(Vec2::new(head.x - dx * segment, head.y - dy * segment));
            }

            self.players.push(Player {
                id: slot as u32,
                alive: true,
                dir,
                body,
                score: 0,
            });
            let cell = self.random_cell();
            self.food.push(cell);
        }

        info!("game initialized with {} players", count);
    }

    /// Adopts the requested heading for each living player unless it is the
    /// exact reverse of the current one; illegal 180-degree turns are
    /// silently dropped.
    pub fn apply_inputs(&mut self, inputs: &[Direction; MAX_PLAYERS]) {
        for player in self.players.iter_mut().filter(|p| p.alive) {
            let requested = inputs[player.id as usize];
            if !player.dir.is_opposite(requested) {
                player.dir = requested;
            }
        }
    }

    /// Advances the simulation one step: move, then food, then collisions.
    /// No-op while the game is inactive.
    pub fn tick(&mut self) {
        if !self.active {
            return;
        }

        self.move_players();
        self.resolve_food();
        self.resolve_collisions();

        if self.alive_count() == 0 {
            self.active = false;
            info!("no players left alive, game over");
        }
    }

    /// Deep, independent copy of the world for broadcasting.
    pub fn snapshot(&self) -> GameState {
        GameState {
            active: self.active,
            players: self
                .players
                .iter()
                .map(|p| PlayerState {
                    id: p.id,
                    alive: p.alive,
                    dir: p.dir,
                    score: p.score,
                    body: p.body.iter().copied().collect(),
                })
                .collect(),
            food: self.food.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    fn move_players(&mut self) {
        for player in self.players.iter_mut().filter(|p| p.alive) {
            let (dx, dy) = player.dir.offset();
            let head = player.body[0];
            player.body.push_front(Vec2::new(head.x + dx, head.y + dy));
            player.body.pop_back();
        }
    }

    fn resolve_food(&mut self) {
        // Heads are matched against the food layout captured at the start of
        // the pass: players landing on the same item in one tick each consume
        // it and trigger a relocation, the last relocation winning.
        let targets = self.food.clone();
        for i in 0..self.players.len() {
            if !self.players[i].alive {
                continue;
            }
            let head = self.players[i].body[0];
            for (slot, cell) in targets.iter().enumerate() {
                if head == *cell {
                    let tail = *self.players[i].body.back().unwrap_or(&head);
                    self.players[i].body.push_back(tail);
                    self.players[i].score += FOOD_SCORE;
                    self.food[slot] = self.random_cell();
                    debug!("player {} ate food at ({}, {})", i, head.x, head.y);
                }
            }
        }
    }

    fn resolve_collisions(&mut self) {
        for i in 0..self.players.len() {
            if !self.players[i].alive {
                continue;
            }
            let head = self.players[i].body[0];

            // Wall collision
            if head.x < 0 || head.y < 0 || head.x >= GRID_WIDTH || head.y >= GRID_HEIGHT {
                self.players[i].alive = false;
                debug!("player {} left the grid at ({}, {})", i, head.x, head.y);
                continue;
            }

            // Body collision against every player, dead bodies included; a
            // player's own head is the only excluded segment.
            let mut collided = false;
            'others: for (j, other) in self.players.iter().enumerate() {
                let skip = if i == j { 1 } else { 0 };
                for segment in other.body.iter().skip(skip) {
                    if *segment == head {
                        collided = true;
                        break 'others;
                    }
                }
            }
            if collided {
                self.players[i].alive = false;
                debug!("player {} collided at ({}, {})", i, head.x, head.y);
            }
        }
    }

    fn random_cell(&mut self) -> Vec2 {
        Vec2 {
            x: self.rng.gen_range(0..GRID_WIDTH),
            y: self.rng.gen_range(0..GRID_HEIGHT),
        }
    }

    #[cfg(test)]
    fn place_food(&mut self, slot: usize, cell: Vec2) {
        self.food[slot] = cell;
    }

    #[cfg(test)]
    fn food(&self) -> &[Vec2] {
        &self.food
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 7;

    fn fresh_game(player_count: usize) -> GameLogic {
        let mut game = GameLogic::with_seed(SEED);
        game.init(player_count);
        game
    }

    /// Applies the same heading request to every slot and ticks once.
    fn steer_and_tick(game: &mut GameLogic, directions: [Direction; MAX_PLAYERS]) {
        game.apply_inputs(&directions);
        game.tick();
    }

    #[test]
    fn test_init_spawn_layout() {
        let game = fresh_game(4);
        let state = game.snapshot();

        assert!(state.active);
        assert_eq!(state.players.len(), 4);
        assert_eq!(state.food.len(), 4);

        let p0 = &state.players[0];
        assert_eq!(p0.id, 0);
        assert!(p0.alive);
        assert_eq!(p0.dir, Direction::Right);
        assert_eq!(p0.score, 0);
        assert_eq!(
            p0.body,
            vec![Vec2::new(10, 10), Vec2::new(9, 10), Vec2::new(8, 10)]
        );

        let p1 = &state.players[1];
        assert_eq!(p1.dir, Direction::Left);
        assert_eq!(
            p1.body,
            vec![Vec2::new(50, 10), Vec2::new(51, 10), Vec2::new(52, 10)]
        );

        for food in &state.food {
            assert!(food.x >= 0 && food.x < GRID_WIDTH);
            assert!(food.y >= 0 && food.y < GRID_HEIGHT);
        }
    }

    #[test]
    fn test_init_caps_player_count() {
        let game = fresh_game(10);
        assert_eq!(game.snapshot().players.len(), MAX_PLAYERS);
    }

    #[test]
    fn test_tick_is_noop_before_init() {
        let mut game = GameLogic::with_seed(SEED);
        assert!(!game.is_active());
        game.tick();
        assert_eq!(game.snapshot().players.len(), 0);
    }

    #[test]
    fn test_straight_run_advances_head_only() {
        let mut game = fresh_game(1);
        // Keep the single food item away from row 10.
        game.place_food(0, Vec2::new(0, 0));

        for _ in 0..10 {
            game.tick();
        }

        let state = game.snapshot();
        let p0 = &state.players[0];
        assert!(p0.alive);
        assert_eq!(p0.body[0], Vec2::new(20, 10));
        assert_eq!(p0.body.len(), INITIAL_BODY_LEN);
        assert_eq!(p0.score, 0);
    }

    #[test]
    fn test_reverse_heading_is_ignored() {
        let mut game = fresh_game(1);
        game.apply_inputs(&[Direction::Left; MAX_PLAYERS]);
        assert_eq!(game.snapshot().players[0].dir, Direction::Right);
    }

    #[test]
    fn test_turn_is_adopted() {
        let mut game = fresh_game(1);
        game.place_food(0, Vec2::new(0, 0));

        steer_and_tick(&mut game, [Direction::Up; MAX_PLAYERS]);

        let p0 = &game.snapshot().players[0];
        assert_eq!(p0.dir, Direction::Up);
        assert_eq!(p0.body[0], Vec2::new(10, 9));
    }

    #[test]
    fn test_food_consumption_grows_and_scores() {
        let mut game = fresh_game(1);
        game.place_food(0, Vec2::new(11, 10));

        // Relocation draws the same rng values a fresh same-seeded instance
        // would draw next.
        let mut reference = GameLogic::with_seed(SEED);
        reference.init(1);
        let expected_relocation = reference.random_cell();

        game.tick();

        let p0 = &game.snapshot().players[0];
        assert_eq!(p0.score, FOOD_SCORE);
        assert_eq!(p0.body.len(), INITIAL_BODY_LEN + 1);
        // Tail was duplicated in place; the copy trails until the next move.
        assert_eq!(
            p0.body,
            vec![
                Vec2::new(11, 10),
                Vec2::new(10, 10),
                Vec2::new(9, 10),
                Vec2::new(9, 10)
            ]
        );
        assert_eq!(game.food()[0], expected_relocation);
    }

    #[test]
    fn test_wall_exit_kills_on_the_same_tick() {
        let mut game = fresh_game(1);
        game.place_food(0, Vec2::new(0, 39));
        game.apply_inputs(&[Direction::Up; MAX_PLAYERS]);

        // Head starts at y=10; it reaches y=0 on the 10th tick and leaves the
        // grid on the 11th.
        for _ in 0..10 {
            game.tick();
        }
        assert!(game.snapshot().players[0].alive);

        game.tick();
        let state = game.snapshot();
        assert!(!state.players[0].alive);
        assert_eq!(state.players[0].body[0], Vec2::new(10, -1));
        assert!(!state.active);

        // Dead is terminal; the body stays frozen.
        let frozen = state.players[0].body.clone();
        game.tick();
        game.tick();
        let after = game.snapshot();
        assert!(!after.players[0].alive);
        assert_eq!(after.players[0].body, frozen);
    }

    #[test]
    fn test_head_on_collision_kills_both() {
        let mut game = fresh_game(2);
        game.place_food(0, Vec2::new(0, 0));
        game.place_food(1, Vec2::new(0, 0));

        // Heads start 40 cells apart on row 10, closing at 2 cells per tick;
        // they meet at (30, 10) on tick 20.
        for _ in 0..19 {
            game.tick();
        }
        let before = game.snapshot();
        assert!(before.players[0].alive);
        assert!(before.players[1].alive);

        game.tick();
        let after = game.snapshot();
        assert!(!after.players[0].alive);
        assert!(!after.players[1].alive);
        assert_eq!(after.players[0].body[0], after.players[1].body[0]);
        assert!(!after.active);
    }

    #[test]
    fn test_self_collision_after_growth() {
        let mut game = fresh_game(1);

        // Grow to 5 segments by feeding two cells in a row.
        game.place_food(0, Vec2::new(11, 10));
        game.tick();
        game.place_food(0, Vec2::new(12, 10));
        game.tick();
        assert_eq!(game.snapshot().players[0].body.len(), 5);

        // A tight left loop re-enters the body on the third turn.
        steer_and_tick(&mut game, [Direction::Up; MAX_PLAYERS]);
        steer_and_tick(&mut game, [Direction::Left; MAX_PLAYERS]);
        assert!(game.snapshot().players[0].alive);
        steer_and_tick(&mut game, [Direction::Down; MAX_PLAYERS]);

        assert!(!game.snapshot().players[0].alive);
    }

    #[test]
    fn test_dead_body_remains_an_obstacle() {
        let mut game = fresh_game(2);
        game.place_food(1, Vec2::new(0, 0));

        // Feed player 0 twice so it is long enough to loop into itself,
        // while player 1 keeps heading left along row 10.
        let hold = |p0: Direction| {
            let mut dirs = [Direction::Left; MAX_PLAYERS];
            dirs[0] = p0;
            dirs
        };

        game.place_food(0, Vec2::new(11, 10));
        steer_and_tick(&mut game, hold(Direction::Right));
        game.place_food(0, Vec2::new(12, 10));
        steer_and_tick(&mut game, hold(Direction::Right));
        game.place_food(0, Vec2::new(0, 0));

        steer_and_tick(&mut game, hold(Direction::Up));
        steer_and_tick(&mut game, hold(Direction::Left));
        steer_and_tick(&mut game, hold(Direction::Down));

        let state = game.snapshot();
        assert!(!state.players[0].alive);
        assert!(state.players[1].alive);

        // Player 0's corpse occupies (12, 10); player 1 is still marching
        // left along row 10 and must die on reaching it.
        assert!(state.players[0].body.contains(&Vec2::new(12, 10)));
        let mut survivor_x = state.players[1].body[0].x;
        while survivor_x > 13 {
            steer_and_tick(&mut game, hold(Direction::Up));
            survivor_x -= 1;
            assert!(game.snapshot().players[1].alive);
        }

        steer_and_tick(&mut game, hold(Direction::Up));
        let state = game.snapshot();
        assert_eq!(state.players[1].body[0], Vec2::new(12, 10));
        assert!(!state.players[1].alive);
        assert!(!state.active);
    }

    #[test]
    fn test_shared_food_cell_feeds_every_consumer() {
        let mut game = fresh_game(2);
        // Both heads arrive at (30, 10) on tick 20; park the food there and
        // move the second item out of the way.
        game.place_food(0, Vec2::new(30, 10));
        game.place_food(1, Vec2::new(0, 0));

        let mut reference = GameLogic::with_seed(SEED);
        reference.init(2);
        let _first_relocation = reference.random_cell();
        let last_relocation = reference.random_cell();

        for _ in 0..20 {
            game.tick();
        }

        let state = game.snapshot();
        // Both consumed the item, then the heads collided on the same tick.
        assert_eq!(state.players[0].score, FOOD_SCORE);
        assert_eq!(state.players[1].score, FOOD_SCORE);
        assert_eq!(state.players[0].body.len(), INITIAL_BODY_LEN + 1);
        assert_eq!(state.players[1].body.len(), INITIAL_BODY_LEN + 1);
        assert!(!state.players[0].alive);
        assert!(!state.players[1].alive);
        // Each consumption relocated the item; only the last draw is visible.
        assert_eq!(game.food()[0], last_relocation);
    }

    #[test]
    fn test_snapshot_is_immutable_across_ticks() {
        let mut game = fresh_game(2);
        let snapshot = game.snapshot();
        let copy = snapshot.clone();

        for _ in 0..5 {
            game.tick();
        }

        assert_eq!(snapshot, copy);
        assert_ne!(game.snapshot().players[0].body, snapshot.players[0].body);
    }

    #[test]
    fn test_reinit_resets_everything() {
        let mut game = fresh_game(2);
        for _ in 0..30 {
            game.tick();
        }
        assert!(!game.is_active());

        game.init(4);
        let state = game.snapshot();
        assert!(state.active);
        assert_eq!(state.players.len(), 4);
        assert!(state.players.iter().all(|p| p.alive && p.score == 0));
        assert_eq!(game.alive_count(), 4);
    }
}
