//! Monte-Carlo tree search with RAVE.
//!
//! The tree lives in an arena: nodes are slots of one `Vec`, children
//! are a contiguous index range allocated at expansion, and freeing
//! the tree is dropping the arena. One tree is built per generated
//! move.
//!
//! Node statistics are kept from the perspective of the side that just
//! moved to reach the node, so the playout score flips sign at every
//! level of the update walk.

use itertools::Itertools;

use crate::constants::*;
use crate::engine::Engine;
use crate::largepat::LargeBoard;
use crate::playout::{gen_capture_moves, mcplayout};
use crate::position::{
    all_neighbors, env8, is_eye, line_height, pass_move, play_move, str_coord, Point, Position,
};
use crate::sets::PointList;
use crate::tactics::{cfg_distances, fix_atari};

pub type NodeId = usize;

pub struct Node {
    pub pos: Position,
    /// Visits and wins.
    pub v: u32,
    pub w: u32,
    /// Prior visits and wins, seeded at expansion.
    pub pv: u32,
    pub pw: u32,
    /// AMAF visits and wins.
    pub av: u32,
    pub aw: u32,
    /// Child range in the arena; None until expanded.
    children: Option<(u32, u32)>,
}

impl Node {
    fn new(pos: Position) -> Self {
        Node {
            pos,
            v: 0,
            w: 0,
            pv: PRIOR_EVEN,
            pw: PRIOR_EVEN / 2,
            av: 0,
            aw: 0,
            children: None,
        }
    }

    pub fn winrate(&self) -> f64 {
        if self.v > 0 {
            self.w as f64 / self.v as f64
        } else {
            f64::NAN
        }
    }

    pub fn expanded(&self) -> bool {
        self.children.is_some()
    }
}

pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// A fresh tree rooted at `pos`.
    pub fn new(pos: &Position) -> Self {
        Tree {
            nodes: vec![Node::new(pos.clone())],
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> std::ops::Range<NodeId> {
        match self.nodes[id].children {
            Some((s, e)) => s as usize..e as usize,
            None => 0..0,
        }
    }
}

/// RAVE-blended expectation: pure prior+visit expectation while no
/// AMAF data exists, shifting toward it with a beta that grows with
/// the AMAF sample and decays with real visits around RAVE_EQUIV.
pub fn urgency(node: &Node) -> f64 {
    let v = (node.v + node.pv) as f64;
    let expectation = (node.w + node.pw) as f64 / v;
    if node.av == 0 {
        return expectation;
    }
    let rave = node.aw as f64 / node.av as f64;
    let av = node.av as f64;
    let beta = av / (av + v + v * av / RAVE_EQUIV as f64);
    beta * rave + (1.0 - beta) * expectation
}

/// Expand `id`: one child per legal non-self-eye move, with priors; a
/// lone PASS child when nothing is playable.
pub fn expand(eng: &mut Engine, tree: &mut Tree, id: NodeId) {
    if tree.nodes[id].expanded() {
        return;
    }
    let parent = tree.nodes[id].pos.clone();

    let cfg = if parent.last != PASS_MOVE {
        Some(cfg_distances(&parent, parent.last))
    } else {
        None
    };

    // Capture tactics over the whole board, ladders included: these
    // priors are worth the work once per expansion.
    let all_points: Vec<Point> = (BOARD_MIN..BOARD_MAX)
        .filter(|&pt| parent.color[pt] != OUT)
        .collect();
    let mut capture_moves = PointList::with_capacity(BOARDSIZE);
    let mut capture_sizes = Vec::new();
    gen_capture_moves(
        eng,
        &parent,
        &all_points,
        1.0,
        true,
        &mut capture_moves,
        &mut capture_sizes,
    );

    let wide_board = (!eng.large.is_empty()).then(|| LargeBoard::from_position(&parent));

    let first_child = tree.nodes.len();
    for pt in BOARD_MIN..BOARD_MAX {
        if parent.color[pt] != EMPTY || is_eye(&parent, pt) == TO_PLAY {
            continue;
        }
        let mut child_pos = parent.clone();
        if play_move(eng, &mut child_pos, pt).is_err() {
            continue;
        }
        let mut child = Node::new(child_pos);
        seed_priors(
            eng,
            &parent,
            &mut child,
            pt,
            cfg.as_deref(),
            (capture_moves.as_slice(), capture_sizes.as_slice()),
            wide_board.as_ref(),
        );
        tree.nodes.push(child);
    }
    if tree.nodes.len() == first_child {
        let mut passed = parent.clone();
        pass_move(&mut passed);
        tree.nodes.push(Node::new(passed));
    }
    tree.nodes[id].children = Some((first_child as u32, tree.nodes.len() as u32));
}

fn seed_priors(
    eng: &mut Engine,
    parent: &Position,
    child: &mut Node,
    pt: Point,
    cfg: Option<&[i32]>,
    captures: (&[Point], &[usize]),
    wide_board: Option<&LargeBoard>,
) {
    // locality: moves near the last move
    if let Some(dist) = cfg {
        let d = dist[pt];
        if (1..=PRIOR_CFG.len() as i32).contains(&d) {
            let bonus = PRIOR_CFG[(d - 1) as usize];
            child.pv += bonus;
            child.pw += bonus;
        }
    }

    // shape
    if eng.pat3.matches(env8(parent, pt)) {
        child.pv += PRIOR_PAT3;
        child.pw += PRIOR_PAT3;
    }
    if let Some(board) = wide_board {
        if let Some(p) = eng.large.probability(board, pt) {
            if p > 0.0 {
                let bonus = (PRIOR_LARGEPATTERN as f64 * (p as f64).sqrt()).round() as u32;
                child.pv += bonus;
                child.pw += bonus;
            }
        }
    }

    // tactics: capturing something, or needing rescue after the move
    let (capture_moves, capture_sizes) = captures;
    if let Some(i) = capture_moves.iter().position(|&mv| mv == pt) {
        let bonus = if capture_sizes[i] == 1 {
            PRIOR_CAPTURE_ONE
        } else {
            PRIOR_CAPTURE_MANY
        };
        child.pv += bonus;
        child.pw += bonus;
    }
    if !fix_atari(eng, &child.pos, pt, true, true, false).moves.is_empty() {
        // visits without wins: a negative prior
        child.pv += PRIOR_SELFATARI;
    }

    // low moves in empty space are poor, third-line ones are fine
    let height = line_height(pt);
    if height <= 2 && is_empty_area(parent, pt, 3) {
        child.pv += PRIOR_EMPTYAREA;
        if height == 2 {
            child.pw += PRIOR_EMPTYAREA;
        }
    }
}

/// No stone within `dist` steps of `pt`.
fn is_empty_area(pos: &Position, pt: Point, dist: usize) -> bool {
    for q in all_neighbors(pt) {
        match pos.color[q] {
            TO_PLAY | OPPONENT => return false,
            EMPTY if dist > 1 && !is_empty_area(pos, q, dist - 1) => return false,
            _ => {}
        }
    }
    true
}

/// Walk from the root to a leaf, always taking the most urgent child
/// (ties broken by a shuffle), expanding a visited leaf on the way and
/// stepping once into the fresh children. Records in-tree moves in the
/// AMAF map and stops after two passes.
fn descend(eng: &mut Engine, tree: &mut Tree, amaf: &mut [i8; BOARDSIZE]) -> Vec<NodeId> {
    let mut path = vec![0];
    let mut passes = 0;
    loop {
        let id = *path.last().unwrap();
        if passes >= 2 || !tree.nodes[id].expanded() {
            break;
        }
        let mut order: Vec<NodeId> = tree.children(id).collect();
        eng.rng.shuffle(&mut order);
        let mut best = order[0];
        for &cand in &order[1..] {
            if urgency(&tree.nodes[cand]) > urgency(&tree.nodes[best]) {
                best = cand;
            }
        }
        let mv = tree.nodes[best].pos.last;
        if mv == PASS_MOVE {
            passes += 1;
        } else {
            passes = 0;
            if amaf[mv] == 0 {
                amaf[mv] = if tree.nodes[id].pos.n % 2 == 0 { 1 } else { -1 };
            }
        }
        if !tree.nodes[best].expanded() && tree.nodes[best].v >= eng.expand_visits {
            expand(eng, tree, best);
        }
        path.push(best);
    }
    path
}

/// Write a playout result back along the path, leaf to root. `score`
/// arrives from the perspective of the side to move at the leaf and
/// flips sign each level; AMAF statistics go to every child of a path
/// node whose move was played first by the side on turn there.
fn update(tree: &mut Tree, path: &[NodeId], amaf: &[i8; BOARDSIZE], mut score: f64) {
    for &id in path.iter().rev() {
        let children = tree.children(id);
        let on_turn = if tree.nodes[id].pos.n % 2 == 0 { 1 } else { -1 };
        {
            let node = &mut tree.nodes[id];
            node.v += 1;
            if score < 0.0 {
                node.w += 1;
            }
        }
        for child_id in children {
            let child = &mut tree.nodes[child_id];
            let mv = child.pos.last;
            if mv != PASS_MOVE && amaf[mv] == on_turn {
                child.av += 1;
                if score > 0.0 {
                    child.aw += 1;
                }
            }
        }
        score = -score;
    }
}

/// Most visited child of `id`.
pub fn best_child(tree: &Tree, id: NodeId) -> Option<NodeId> {
    tree.children(id).max_by_key(|&c| tree.nodes[c].v)
}

/// Run `n_sims` simulations from the root and pick the move to play:
/// the most visited child, RESIGN when even it wins too rarely, PASS
/// when the game just ended with two passes.
///
/// Stops early once the best child's winrate is beyond doubt, and
/// reports progress every REPORT_PERIOD simulations when `disp`.
pub fn tree_search(
    eng: &mut Engine,
    tree: &mut Tree,
    n_sims: usize,
    owner: &mut [i32; BOARDSIZE],
    disp: bool,
) -> Point {
    if !tree.nodes[0].expanded() {
        expand(eng, tree, 0);
    }
    let mut amaf = Box::new([0i8; BOARDSIZE]);
    let mut simulated = 0;

    for i in 0..n_sims {
        simulated = i + 1;
        amaf.fill(0);
        if disp && i > 0 && i % REPORT_PERIOD == 0 {
            log_summary(tree, i);
        }

        let path = descend(eng, tree, &mut amaf);
        let leaf = *path.last().unwrap();
        let mut playout_pos = tree.nodes[leaf].pos.clone();
        let score = mcplayout(eng, &mut playout_pos, &mut amaf, Some(&mut *owner), false);
        update(tree, &path, &amaf, score);

        if let Some(best) = best_child(tree, 0) {
            let node = &tree.nodes[best];
            if node.v > 0 {
                let wr = node.winrate();
                if (i > n_sims / 20 && wr > FASTPLAY5_THRES)
                    || (i > n_sims / 5 && wr > FASTPLAY20_THRES)
                {
                    break;
                }
            }
        }
    }

    if disp {
        log_subtree(tree, (n_sims / 50) as u32);
        log_summary(tree, simulated);
    }

    let Some(best) = best_child(tree, 0) else {
        return PASS_MOVE;
    };
    let node = &tree.nodes[best];
    if node.v > 0 && node.winrate() < RESIGN_THRES {
        return RESIGN_MOVE;
    }
    let root = &tree.nodes[0].pos;
    if root.last == PASS_MOVE && root.last2 == PASS_MOVE {
        return PASS_MOVE;
    }
    node.pos.last
}

/// One progress line: best winrate, principal sequence, top candidates.
fn log_summary(tree: &Tree, sims: usize) {
    let ranked: Vec<NodeId> = tree
        .children(0)
        .sorted_by_key(|&c| std::cmp::Reverse(tree.nodes[c].v))
        .collect();
    let Some(&best) = ranked.first() else {
        return;
    };

    let mut sequence = Vec::new();
    let mut id = 0;
    for _ in 0..5 {
        let Some(next) = best_child(tree, id) else {
            break;
        };
        sequence.push(str_coord(tree.nodes[next].pos.last));
        id = next;
    }

    let candidates = ranked
        .iter()
        .take(5)
        .map(|&c| {
            let node = &tree.nodes[c];
            format!("{}({:.3})", str_coord(node.pos.last), node.winrate())
        })
        .join(" ");
    log::info!(
        "[{sims:>5}] winrate {:.3} | seq {} | can {}",
        tree.nodes[best].winrate(),
        sequence.join(" "),
        candidates
    );
}

/// Log the root's children visited at least `threshold` times, with
/// their statistics and one level of grandchildren.
fn log_subtree(tree: &Tree, threshold: u32) {
    for id in tree.children(0) {
        let node = &tree.nodes[id];
        if node.v < threshold.max(1) {
            continue;
        }
        log::debug!(
            "{} {:.3} ({}/{}, prior {}/{}, rave {}/{}, urgency {:.3})",
            str_coord(node.pos.last),
            node.winrate(),
            node.w,
            node.v,
            node.pw,
            node.pv,
            node.aw,
            node.av,
            urgency(node)
        );
        if let Some(grand) = best_child(tree, id) {
            let g = &tree.nodes[grand];
            if g.v > 0 {
                log::debug!(
                    "   +- {} {:.3} ({}/{})",
                    str_coord(g.pos.last),
                    g.winrate(),
                    g.w,
                    g.v
                );
            }
        }
    }
}
