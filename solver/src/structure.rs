//! Population structure: who interacts with whom.
//!
//! A well-mixed population of size Z lets every individual meet every other; its
//! neighborhood is represented symbolically as "everyone except me" so nothing of
//! size Z² is ever materialized. Networks store an adjacency list per individual.
//!
//! Exact Markov analysis works on compositions and therefore needs a well-mixed
//! population. Networks are only simulated, see [`crate::simulation::NetworkSimulator`].

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EgtError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PopulationStructure {
    WellMixed { size: usize },
    Network { adjacency: Vec<Vec<usize>> },
}

/// Neighborhood of one individual.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Neighbors<'a> {
    /// Every individual of a population of `population` except `individual`.
    AllExcept { individual: usize, population: usize },
    Listed(&'a [usize]),
}

impl<'a> Neighbors<'a> {
    pub fn len(&self) -> usize {
        match *self {
            Neighbors::AllExcept { population, .. } => population.saturating_sub(1),
            Neighbors::Listed(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k`-th neighbor in ascending id order.
    pub fn get(&self, k: usize) -> Option<usize> {
        match *self {
            Neighbors::AllExcept {
                individual,
                population,
            } => {
                if k + 1 >= population {
                    None
                } else if k < individual {
                    Some(k)
                } else {
                    Some(k + 1)
                }
            }
            Neighbors::Listed(list) => list.get(k).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + 'a {
        let this = *self;
        (0..this.len()).filter_map(move |k| this.get(k))
    }
}

impl PopulationStructure {
    pub fn well_mixed(size: usize) -> Result<Self> {
        if size < 1 {
            return Err(EgtError::invalid("population_size", "must be at least 1"));
        }
        Ok(PopulationStructure::WellMixed { size })
    }

    /// Ring of `size` nodes, each linked to its `k` nearest neighbors on either side.
    pub fn ring(size: usize, k: usize) -> Result<Self> {
        if k < 1 {
            return Err(EgtError::invalid("k", "must be at least 1"));
        }
        if size < 2 * k + 1 {
            return Err(EgtError::invalid(
                "population_size",
                format!("ring with k={k} needs at least {} nodes, got {size}", 2 * k + 1),
            ));
        }
        let adjacency = (0..size)
            .map(|i| {
                let mut list: Vec<usize> = (1..=k)
                    .flat_map(|d| [(i + size - d) % size, (i + d) % size])
                    .collect();
                list.sort_unstable();
                list
            })
            .collect();
        Ok(PopulationStructure::Network { adjacency })
    }

    /// `width × height` torus with von Neumann (4-neighbor) adjacency.
    pub fn lattice(width: usize, height: usize) -> Result<Self> {
        if width < 3 || height < 3 {
            return Err(EgtError::invalid(
                "lattice",
                format!("needs width and height of at least 3, got {width}×{height}"),
            ));
        }
        let node = |x: usize, y: usize| y * width + x;
        let mut adjacency = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let mut list = vec![
                    node((x + width - 1) % width, y),
                    node((x + 1) % width, y),
                    node(x, (y + height - 1) % height),
                    node(x, (y + 1) % height),
                ];
                list.sort_unstable();
                adjacency.push(list);
            }
        }
        Ok(PopulationStructure::Network { adjacency })
    }

    /// Undirected network from an edge list. Duplicate edges are merged.
    pub fn from_edges(size: usize, edges: &[(usize, usize)]) -> Result<Self> {
        if size < 2 {
            return Err(EgtError::invalid("population_size", "network needs at least 2 nodes"));
        }
        let mut adjacency = vec![Vec::new(); size];
        for &(a, b) in edges {
            if a >= size || b >= size {
                return Err(EgtError::invalid(
                    "edges",
                    format!("edge ({a}, {b}) has an endpoint outside 0..{size}"),
                ));
            }
            if a == b {
                return Err(EgtError::invalid("edges", format!("self-loop at node {a}")));
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }
        if let Some(isolated) = adjacency.iter().position(Vec::is_empty) {
            return Err(EgtError::invalid(
                "edges",
                format!("node {isolated} has no neighbors"),
            ));
        }
        Ok(PopulationStructure::Network { adjacency })
    }

    pub fn size(&self) -> usize {
        match self {
            PopulationStructure::WellMixed { size } => *size,
            PopulationStructure::Network { adjacency } => adjacency.len(),
        }
    }

    pub fn is_well_mixed(&self) -> bool {
        matches!(self, PopulationStructure::WellMixed { .. })
    }

    pub fn neighbors(&self, individual: usize) -> Result<Neighbors<'_>> {
        if individual >= self.size() {
            return Err(EgtError::invalid(
                "individual",
                format!("{individual} out of range for population {}", self.size()),
            ));
        }
        Ok(match self {
            PopulationStructure::WellMixed { size } => Neighbors::AllExcept {
                individual,
                population: *size,
            },
            PopulationStructure::Network { adjacency } => Neighbors::Listed(&adjacency[individual]),
        })
    }

    pub fn degree(&self, individual: usize) -> Result<usize> {
        Ok(self.neighbors(individual)?.len())
    }

    /// Uniformly random neighbor, `None` for an isolated individual.
    pub fn random_neighbor<R: Rng + ?Sized>(&self, individual: usize, rng: &mut R) -> Result<Option<usize>> {
        let neighbors = self.neighbors(individual)?;
        if neighbors.is_empty() {
            return Ok(None);
        }
        Ok(neighbors.get(rng.random_range(0..neighbors.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_well_mixed_is_symbolic() {
        let s = PopulationStructure::well_mixed(5).unwrap();
        let n = s.neighbors(2).unwrap();
        assert_eq!(n, Neighbors::AllExcept { individual: 2, population: 5 });
        assert_eq!(n.len(), 4);
        assert_eq!(n.iter().collect::<Vec<_>>(), vec![0, 1, 3, 4]);
        assert_eq!(n.get(4), None);
        assert!(s.is_well_mixed());
        assert!(PopulationStructure::well_mixed(0).is_err());
    }

    #[test]
    fn test_ring_neighbors() {
        let s = PopulationStructure::ring(6, 1).unwrap();
        assert_eq!(s.neighbors(0).unwrap().iter().collect::<Vec<_>>(), vec![1, 5]);
        let s = PopulationStructure::ring(7, 2).unwrap();
        assert_eq!(s.neighbors(6).unwrap().iter().collect::<Vec<_>>(), vec![0, 1, 4, 5]);
        assert_eq!(s.degree(3).unwrap(), 4);
        assert!(PopulationStructure::ring(4, 2).is_err());
        assert!(PopulationStructure::ring(4, 0).is_err());
    }

    #[test]
    fn test_lattice_wraps() {
        let s = PopulationStructure::lattice(3, 3).unwrap();
        assert_eq!(s.size(), 9);
        // Corner (0, 0) wraps to (2, 0) and (0, 2).
        assert_eq!(s.neighbors(0).unwrap().iter().collect::<Vec<_>>(), vec![1, 2, 3, 6]);
        assert!(!s.is_well_mixed());
        assert!(PopulationStructure::lattice(2, 5).is_err());
    }

    #[test]
    fn test_from_edges_validation() {
        let s = PopulationStructure::from_edges(3, &[(0, 1), (1, 2), (1, 0)]).unwrap();
        assert_eq!(s.neighbors(1).unwrap().iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(s.degree(0).unwrap(), 1);
        assert!(PopulationStructure::from_edges(3, &[(0, 3)]).is_err());
        assert!(PopulationStructure::from_edges(3, &[(1, 1), (0, 2)]).is_err());
        assert!(PopulationStructure::from_edges(3, &[(0, 1)]).is_err());
        assert!(s.neighbors(3).is_err());
    }

    #[test]
    fn test_random_neighbor_is_adjacent() {
        let s = PopulationStructure::lattice(4, 4).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..100 {
            let j = s.random_neighbor(5, &mut rng).unwrap().unwrap();
            assert!(s.neighbors(5).unwrap().iter().any(|n| n == j));
        }
        let single = PopulationStructure::well_mixed(1).unwrap();
        assert_eq!(single.random_neighbor(0, &mut rng).unwrap(), None);
    }
}
