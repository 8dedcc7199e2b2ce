use crate::sat::formula::{Idx, Lit, Var, VarMap};

/// Result of running SCC-based equivalence detection over a binary
/// implication graph: either a substitution table mapping each
/// non-representative literal to its class representative, or a
/// contradiction (some literal and its negation landed in the same
/// component, which proves the formula unsatisfiable).
pub enum Outcome {
    Substitution(VarMap<Lit>),
    Contradiction,
}

/// Index a literal densely as `2*var + sign`, matching the donor's own
/// literal packing so the graph can be addressed with plain `Vec`s.
#[inline]
fn lit_index(l: Lit) -> usize {
    (l.var().idx() as usize) * 2 + (l.sign() as usize)
}

struct Graph {
    adj: Vec<Vec<usize>>,
}

impl Graph {
    fn new(n_vars: usize) -> Self {
        Graph { adj: vec![Vec::new(); n_vars * 2] }
    }

    fn add_edge(&mut self, from: Lit, to: Lit) {
        self.adj[lit_index(from)].push(lit_index(to));
    }
}

/// Tarjan's strongly-connected-components algorithm, iterative (explicit
/// work stack) so that a long chain of binary implications can't blow the
/// native call stack.
struct Tarjan {
    index_counter: usize,
    stack: Vec<usize>,
    on_stack: Vec<bool>,
    indices: Vec<Option<usize>>,
    low_link: Vec<usize>,
    components: Vec<Vec<usize>>,
}

enum Frame {
    Enter(usize),
    Finish(usize, usize), // node, neighbour index already consumed
}

impl Tarjan {
    fn new(n: usize) -> Self {
        Tarjan {
            index_counter: 0,
            stack: Vec::new(),
            on_stack: vec![false; n],
            indices: vec![None; n],
            low_link: vec![0; n],
            components: Vec::new(),
        }
    }

    fn run(&mut self, graph: &Graph) {
        for start in 0..graph.adj.len() {
            if self.indices[start].is_none() {
                self.strong_connect(graph, start);
            }
        }
    }

    fn strong_connect(&mut self, graph: &Graph, start: usize) {
        let mut work: Vec<Frame> = vec![Frame::Enter(start)];

        while let Some(frame) = work.pop() {
            match frame {
                Frame::Enter(v) => {
                    if self.indices[v].is_some() {
                        continue;
                    }
                    self.indices[v] = Some(self.index_counter);
                    self.low_link[v] = self.index_counter;
                    self.index_counter += 1;
                    self.stack.push(v);
                    self.on_stack[v] = true;
                    work.push(Frame::Finish(v, 0));
                }

                Frame::Finish(v, mut i) => {
                    let mut recursed = false;
                    while i < graph.adj[v].len() {
                        let w = graph.adj[v][i];
                        i += 1;
                        if self.indices[w].is_none() {
                            work.push(Frame::Finish(v, i));
                            work.push(Frame::Enter(w));
                            recursed = true;
                            break;
                        } else if self.on_stack[w] {
                            self.low_link[v] = self.low_link[v].min(self.indices[w].unwrap());
                        }
                    }

                    if recursed {
                        continue;
                    }

                    // All neighbours are processed; if v started its own
                    // component, pop the whole component off the stack.
                    if self.low_link[v] == self.indices[v].unwrap() {
                        let mut component = Vec::new();
                        loop {
                            let w = self.stack.pop().unwrap();
                            self.on_stack[w] = false;
                            component.push(w);
                            if w == v {
                                break;
                            }
                        }
                        self.components.push(component);
                    }

                    if let Some(Frame::Finish(parent, _)) = work.last() {
                        let parent = *parent;
                        self.low_link[parent] = self.low_link[parent].min(self.low_link[v]);
                    }
                }
            }
        }
    }
}

/// Run Tarjan's SCC over the implication graph induced by `binaries`
/// (each `(l1, l2)` is one binary clause `{l1, l2}`, inducing edges
/// `¬l1 -> l2` and `¬l2 -> l1`) and derive an equivalence substitution:
/// every literal in a non-trivial component is mapped to one
/// representative literal of that component.
pub fn run(n_vars: usize, binaries: &[(Lit, Lit)]) -> Outcome {
    let mut graph = Graph::new(n_vars);
    for &(l1, l2) in binaries {
        graph.add_edge(!l1, l2);
        graph.add_edge(!l2, l1);
    }

    let mut tarjan = Tarjan::new(n_vars * 2);
    tarjan.run(&graph);

    // Tarjan emits components in reverse topological order; that is also a
    // valid processing order here since we only need membership, not order.
    let index_to_lit = |idx: usize| -> Lit {
        let v: Var = Idx::unidx(idx / 2);
        v.sign_lit(idx % 2 == 1)
    };

    let mut assigned_component: Vec<Option<usize>> = vec![None; n_vars * 2];
    for (ci, component) in tarjan.components.iter().enumerate() {
        for &idx in component {
            assigned_component[idx] = Some(ci);
        }
    }

    let mut subst = VarMap::new();
    for component in tarjan.components.iter() {
        if component.len() < 2 {
            continue;
        }

        // Contradiction: a literal and its negation are equivalent.
        for &idx in component {
            let complement = idx ^ 1;
            if assigned_component[complement] == assigned_component[idx] {
                return Outcome::Contradiction;
            }
        }

        // Smallest literal index in the component is the representative, so
        // substitution is deterministic regardless of Tarjan's pop order.
        let rep_idx = *component.iter().min().unwrap();
        let rep = index_to_lit(rep_idx);
        for &idx in component {
            if idx == rep_idx {
                continue;
            }
            let l = index_to_lit(idx);
            // Only record one direction per variable; the complementary
            // literal substitutes to the complement of the representative.
            if !l.sign() {
                subst.insert(&l.var(), rep);
            } else {
                subst.insert(&l.var(), !rep);
            }
        }
    }

    Outcome::Substitution(subst)
}

/// Follow a substitution chain to the final representative literal,
/// flipping sign as needed. `subst` never contains chains longer than one
/// hop by construction (`run` always maps to a component representative),
/// but this stays safe if that ever changes.
pub fn resolve(subst: &VarMap<Lit>, l: Lit) -> Lit {
    match subst.get(&l.var()) {
        Some(&rep) => if l.sign() { !rep } else { rep },
        None => l,
    }
}
