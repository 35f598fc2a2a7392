
use quantifiable_derive::Quantifiable;//the derive macro
use crate::matrix::Matrix;
use super::{Arbiter,ArbiterRequests,Selection};

/// Keeps for each pair of inputs which one has preference.
/// `beats(i,j)` means `i` wins over `j` at equal priority. Initially lower inputs win.
/// Granting an input makes it lose against every other input.
#[derive(Clone,Debug,Quantifiable)]
pub struct MatrixArbiter
{
	requests: ArbiterRequests,
	beats: Matrix<bool>,
	last_request: Option<usize>,
}

impl MatrixArbiter
{
	pub fn new(size:usize) -> MatrixArbiter
	{
		let mut beats=Matrix::constant(false,size,size);
		for i in 0..size
		{
			for j in i+1..size
			{
				*beats.get_mut(i,j)=true;
			}
		}
		MatrixArbiter{
			requests: ArbiterRequests::new(size),
			beats,
			last_request: None,
		}
	}
}

impl Arbiter for MatrixArbiter
{
	fn size(&self) -> usize
	{
		self.requests.size()
	}
	fn add_request(&mut self, input:usize, id:usize, priority:i64)
	{
		self.last_request=Some(input);
		self.requests.add(input,id,priority);
	}
	fn arbitrate(&mut self) -> Option<Selection>
	{
		//With a single request there is nothing to compare.
		let winner = if self.requests.num_requests()<2
		{
			self.last_request
		}
		else
		{
			let entries=self.requests.entries();
			(0..entries.len()).find(|&input|{
				match entries[input]
				{
					None => false,
					Some(ref candidate) => !entries.iter().enumerate().any(|(other,entry)|match entry
					{
						Some(ref rival) => rival.priority>candidate.priority || (rival.priority==candidate.priority && *self.beats.get(other,input)),
						None => false,
					}),
				}
			})
		};
		self.requests.select(winner)
	}
	fn update_state(&mut self)
	{
		if let Some(selected)=self.requests.selected()
		{
			for other in 0..self.size()
			{
				if other!=selected
				{
					*self.beats.get_mut(selected,other)=false;
					*self.beats.get_mut(other,selected)=true;
				}
			}
		}
	}
	fn clear(&mut self)
	{
		self.last_request=None;
		self.requests.clear();
	}
	fn last_winner(&self) -> Option<usize>
	{
		self.requests.selected()
	}
	fn num_requests(&self) -> usize
	{
		self.requests.num_requests()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn winner_becomes_lowest()
	{
		let mut arbiter=MatrixArbiter::new(3);
		let mut winners=vec![];
		for _ in 0..6
		{
			arbiter.clear();
			for input in 0..3
			{
				arbiter.add_request(input,input,0);
			}
			winners.push(arbiter.arbitrate().unwrap().input);
			arbiter.update_state();
		}
		assert_eq!(winners,vec![0,1,2,0,1,2]);
	}
	#[test]
	fn priority_before_matrix()
	{
		let mut arbiter=MatrixArbiter::new(3);
		arbiter.add_request(0,0,0);
		arbiter.add_request(2,5,3);
		assert_eq!(arbiter.arbitrate().unwrap().id,5);
	}
	#[test]
	fn single_request_wins()
	{
		let mut arbiter=MatrixArbiter::new(4);
		arbiter.add_request(3,1,-2);
		assert_eq!(arbiter.arbitrate().unwrap().input,3);
	}
}

