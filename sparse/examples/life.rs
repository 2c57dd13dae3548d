use std::{cell::Cell as Counter, collections::HashMap, rc::Rc};

use rusty_sparse::ecs::{Component, Entity, GroupId, GroupLayout, World};

const GRID_WIDTH: usize = 20;
const GRID_HEIGHT: usize = 20;
const GENERATIONS: usize = 8;

#[derive(Component)]
struct Cell;

#[derive(Component, PartialEq, Eq, Hash, Clone, Copy)]
struct Position {
    x: i32,
    y: i32,
}

fn compute_cells(world: &mut World, cells: GroupId) {
    let mut new_cells = Vec::new();
    let mut to_remove = Vec::new();

    let directions = [
        (-1, 1),
        (0, 1),
        (1, 1),
        (-1, 0),
        (1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];

    // Positions of live cells for neighbour lookup
    let mut pos_map = HashMap::new();
    let mut min_x = 0;
    let mut max_x = 0;
    let mut min_y = 0;
    let mut max_y = 0;

    for &entity in world.group_entities(cells) {
        let pos = *world.get::<Position>(entity);
        pos_map.insert(pos, entity);

        min_x = min_x.min(pos.x);
        max_x = max_x.max(pos.x);
        min_y = min_y.min(pos.y);
        max_y = max_y.max(pos.y);
    }

    for x in (min_x - 1)..=(max_x + 1) {
        for y in (min_y - 1)..=(max_y + 1) {
            let current_pos = Position { x, y };
            let live_neighbors = directions
                .iter()
                .filter(|(dx, dy)| {
                    pos_map.contains_key(&Position {
                        x: current_pos.x + dx,
                        y: current_pos.y + dy,
                    })
                })
                .count();

            if pos_map.contains_key(&current_pos) {
                if !(2..=3).contains(&live_neighbors) {
                    to_remove.push(current_pos);
                }
            } else if live_neighbors == 3 {
                new_cells.push(current_pos);
            }
        }
    }

    for pos in new_cells {
        spawn_cell(world, pos);
    }

    for pos in to_remove {
        if let Some(&entity) = pos_map.get(&pos) {
            world.despawn(entity);
        }
    }
}

fn spawn_cell(world: &mut World, pos: Position) -> Entity {
    let entity = world.spawn();
    world.emplace(entity, pos);
    world.emplace(entity, Cell);
    entity
}

fn render_world(world: &World, cells: GroupId) {
    let mut grid = vec![vec!['.'; GRID_WIDTH]; GRID_HEIGHT];

    for &entity in world.group_entities(cells) {
        let pos = world.get::<Position>(entity);
        if pos.x >= 0 && pos.x < GRID_WIDTH as i32 && pos.y >= 0 && pos.y < GRID_HEIGHT as i32 {
            grid[GRID_HEIGHT - pos.y as usize - 1][pos.x as usize] = '#';
        }
    }

    for row in grid {
        let line: String = row.into_iter().collect();
        println!("{}", line);
    }
}

fn main() {
    println!("=============================================================");
    println!("Game of life!");
    println!("=============================================================");

    let mut world = World::new();
    let cells = world
        .group(GroupLayout::new().owned::<Position>().get::<Cell>())
        .expect("fresh world accepts the group");

    let births = Rc::new(Counter::new(0));
    let deaths = Rc::new(Counter::new(0));
    {
        let births = births.clone();
        world.on_construct::<Cell>(move |_, _| births.set(births.get() + 1));
        let deaths = deaths.clone();
        world.on_destroy::<Cell>(move |_, _| deaths.set(deaths.get() + 1));
    }

    // Glider
    for (x, y) in [(1, 3), (2, 1), (2, 3), (3, 2), (3, 3)] {
        spawn_cell(&mut world, Position { x, y: y + 10 });
    }

    for generation in 0..GENERATIONS {
        println!(
            "\nGeneration {generation}: {} live cells ({} born, {} died)",
            world.group_len(cells),
            births.get(),
            deaths.get()
        );
        render_world(&world, cells);
        compute_cells(&mut world, cells);
    }
}
